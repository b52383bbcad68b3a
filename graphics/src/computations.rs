//! Buffer source computations derived from topologies.

use std::sync::Arc;

use hydrant_core::{
    BasisCurvesTopology, ComponentType, CurveType, MeshTopology, PrimPath, Token, TupleType,
    tokens,
};

use crate::buffer::BufferSource;
use crate::error::Result;

const INT2: TupleType = TupleType::new(ComponentType::Int32, 2);
const INT3: TupleType = TupleType::new(ComponentType::Int32, 3);
const INT4: TupleType = TupleType::new(ComponentType::Int32, 4);
const FLOAT: TupleType = TupleType::new(ComponentType::Float32, 1);
const FLOAT3: TupleType = TupleType::new(ComponentType::Float32, 3);

/// Default width for curves with unusable authored widths.
pub const DEFAULT_CURVE_WIDTH: f32 = 1.0;
/// Default normal for curves with unusable authored normals.
pub const DEFAULT_CURVE_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

// ============================================================================
// Curve indices
// ============================================================================

/// Builds the `indices` buffer of a basis curves topology.
///
/// Refined cubic curves produce four-point patches, everything else
/// produces two-point line segments.
#[derive(Debug)]
pub struct CurveIndexBuilder {
    name: Token,
    topology: Arc<BasisCurvesTopology>,
    patches: bool,
}

impl CurveIndexBuilder {
    pub fn new(topology: Arc<BasisCurvesTopology>, refine: bool) -> Self {
        let patches = refine && topology.curve_type == CurveType::Cubic;
        Self {
            name: tokens::INDICES,
            topology,
            patches,
        }
    }

    /// Whether the builder emits cubic patches.
    pub fn builds_patches(&self) -> bool {
        self.patches
    }
}

impl BufferSource for CurveIndexBuilder {
    fn name(&self) -> &Token {
        &self.name
    }

    fn tuple_type(&self) -> TupleType {
        if self.patches { INT4 } else { INT2 }
    }

    fn num_elements(&self) -> usize {
        if self.patches {
            self.topology.cubic_patch_count()
        } else {
            self.topology.line_segment_count()
        }
    }

    fn resolve(&self) -> Result<Vec<u8>> {
        hydrant_core::profile_scope!("curve_indices");
        let bytes = if self.patches {
            bytemuck::cast_slice(&self.topology.build_cubic_patch_indices()).to_vec()
        } else {
            bytemuck::cast_slice(&self.topology.build_line_segment_indices()).to_vec()
        };
        Ok(bytes)
    }
}

// ============================================================================
// Curve primvar interpolation
// ============================================================================

/// How an authored per-vertex array maps onto the control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expansion {
    Copy,
    Broadcast,
    Default,
}

fn expansion(name: &Token, authored: usize, needed: usize) -> Expansion {
    if authored == needed {
        Expansion::Copy
    } else if authored == 1 {
        Expansion::Broadcast
    } else {
        log::warn!(
            "{name}: {authored} values authored for {needed} control points, using defaults"
        );
        Expansion::Default
    }
}

fn expand<T: Copy>(values: &[T], needed: usize, mode: Expansion, fallback: T) -> Vec<T> {
    match mode {
        Expansion::Copy => values.to_vec(),
        Expansion::Broadcast => vec![values[0]; needed],
        Expansion::Default => vec![fallback; needed],
    }
}

/// Expands authored curve widths to one width per control point.
#[derive(Debug)]
pub struct CurveWidthsInterpolator {
    name: Token,
    widths: Vec<f32>,
    needed: usize,
    mode: Expansion,
}

impl CurveWidthsInterpolator {
    pub fn new(topology: &BasisCurvesTopology, widths: Vec<f32>) -> Self {
        let needed = topology.calculate_needed_number_of_control_points();
        let mode = expansion(&tokens::WIDTHS, widths.len(), needed);
        Self {
            name: tokens::WIDTHS,
            widths,
            needed,
            mode,
        }
    }
}

impl BufferSource for CurveWidthsInterpolator {
    fn name(&self) -> &Token {
        &self.name
    }

    fn tuple_type(&self) -> TupleType {
        FLOAT
    }

    fn num_elements(&self) -> usize {
        self.needed
    }

    fn resolve(&self) -> Result<Vec<u8>> {
        let widths = expand(&self.widths, self.needed, self.mode, DEFAULT_CURVE_WIDTH);
        Ok(bytemuck::cast_slice(&widths).to_vec())
    }
}

/// Expands authored curve normals to one normal per control point.
#[derive(Debug)]
pub struct CurveNormalsInterpolator {
    name: Token,
    normals: Vec<[f32; 3]>,
    needed: usize,
    mode: Expansion,
}

impl CurveNormalsInterpolator {
    pub fn new(topology: &BasisCurvesTopology, normals: Vec<[f32; 3]>) -> Self {
        let needed = topology.calculate_needed_number_of_control_points();
        let mode = expansion(&tokens::NORMALS, normals.len(), needed);
        Self {
            name: tokens::NORMALS,
            normals,
            needed,
            mode,
        }
    }
}

impl BufferSource for CurveNormalsInterpolator {
    fn name(&self) -> &Token {
        &self.name
    }

    fn tuple_type(&self) -> TupleType {
        FLOAT3
    }

    fn num_elements(&self) -> usize {
        self.needed
    }

    fn resolve(&self) -> Result<Vec<u8>> {
        let normals = expand(&self.normals, self.needed, self.mode, DEFAULT_CURVE_NORMAL);
        Ok(bytemuck::cast_slice(&normals).to_vec())
    }
}

// ============================================================================
// Mesh triangles
// ============================================================================

/// Builds the triangle `indices` buffer of a mesh topology.
#[derive(Debug)]
pub struct TriangleIndexBuilder {
    name: Token,
    triangles: Vec<[i32; 3]>,
}

impl TriangleIndexBuilder {
    /// Triangulate `topology`. Degenerate faces are dropped with a warning
    /// naming `id`.
    pub fn new(topology: &MeshTopology, id: &PrimPath) -> Self {
        hydrant_core::profile_scope!("triangulate");
        let (triangles, skipped) = topology.triangulate();
        if skipped > 0 {
            log::warn!("{id}: skipped {skipped} degenerate faces while triangulating");
        }
        Self {
            name: tokens::INDICES,
            triangles,
        }
    }
}

impl BufferSource for TriangleIndexBuilder {
    fn name(&self) -> &Token {
        &self.name
    }

    fn tuple_type(&self) -> TupleType {
        INT3
    }

    fn num_elements(&self) -> usize {
        self.triangles.len()
    }

    fn resolve(&self) -> Result<Vec<u8>> {
        Ok(bytemuck::cast_slice(&self.triangles).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrant_core::{CurveBasis, CurveWrap};

    fn cubic(counts: Vec<i32>) -> Arc<BasisCurvesTopology> {
        Arc::new(BasisCurvesTopology::new(
            CurveType::Cubic,
            CurveBasis::CatmullRom,
            CurveWrap::NonPeriodic,
            counts,
        ))
    }

    fn ints(bytes: &[u8]) -> Vec<i32> {
        bytes
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn unrefined_curves_build_segments() {
        let builder = CurveIndexBuilder::new(cubic(vec![4]), false);
        assert!(!builder.builds_patches());
        assert_eq!(builder.tuple_type(), INT2);
        assert_eq!(builder.num_elements(), 3);
        assert_eq!(ints(&builder.resolve().unwrap()), vec![0, 1, 1, 2, 2, 3]);
    }

    #[test]
    fn refined_cubic_curves_build_patches() {
        let builder = CurveIndexBuilder::new(cubic(vec![5]), true);
        assert!(builder.builds_patches());
        assert_eq!(builder.num_elements(), 2);
        assert_eq!(ints(&builder.resolve().unwrap()), vec![0, 1, 2, 3, 1, 2, 3, 4]);
    }

    #[test]
    fn refined_linear_curves_stay_segments() {
        let topology = Arc::new(BasisCurvesTopology::new(
            CurveType::Linear,
            CurveBasis::Bezier,
            CurveWrap::Periodic,
            vec![3],
        ));
        let builder = CurveIndexBuilder::new(topology, true);
        assert!(!builder.builds_patches());
        assert_eq!(ints(&builder.resolve().unwrap()), vec![0, 1, 1, 2, 2, 0]);
    }

    #[test]
    fn widths_copy_broadcast_and_default() {
        let topology = cubic(vec![4]);
        let exact = CurveWidthsInterpolator::new(&topology, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(floats(&exact.resolve().unwrap()), vec![1.0, 2.0, 3.0, 4.0]);

        let single = CurveWidthsInterpolator::new(&topology, vec![0.5]);
        assert_eq!(single.num_elements(), 4);
        assert_eq!(floats(&single.resolve().unwrap()), vec![0.5; 4]);

        let wrong = CurveWidthsInterpolator::new(&topology, vec![0.5, 0.7]);
        assert_eq!(floats(&wrong.resolve().unwrap()), vec![DEFAULT_CURVE_WIDTH; 4]);
    }

    #[test]
    fn normals_broadcast() {
        let topology = cubic(vec![2, 2]);
        let normals = CurveNormalsInterpolator::new(&topology, vec![[1.0, 0.0, 0.0]]);
        assert_eq!(normals.num_elements(), 4);
        assert_eq!(normals.resolve().unwrap().len(), 4 * 12);
    }

    #[test]
    fn quad_triangulates_to_two() {
        let topology = MeshTopology::new(vec![4, 2], vec![0, 1, 2, 3, 0, 1]);
        let builder = TriangleIndexBuilder::new(&topology, &PrimPath::new("/plane"));
        assert_eq!(builder.num_elements(), 2);
        assert_eq!(ints(&builder.resolve().unwrap()), vec![0, 1, 2, 0, 2, 3]);
    }
}
