//! Basis curves topology.

use super::{ContentHasher, TopologyId};

/// Curve degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CurveType {
    /// Polyline through every control point.
    #[default]
    Linear,
    /// Cubic spline; the basis picks the spline family.
    Cubic,
}

/// Spline family for cubic curves. Ignored by linear curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CurveBasis {
    #[default]
    Bezier,
    BSpline,
    CatmullRom,
}

impl CurveBasis {
    /// Control-point advance between consecutive cubic segments.
    pub fn vstep(&self) -> usize {
        match self {
            Self::Bezier => 3,
            Self::BSpline | Self::CatmullRom => 1,
        }
    }
}

/// Whether each curve closes on itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CurveWrap {
    #[default]
    NonPeriodic,
    Periodic,
}

/// Topology of a batch of curves sharing type, basis and wrap.
///
/// `curve_vertex_counts` holds the control-point count of each curve. When
/// `curve_indices` is non-empty, curve vertices address points through it;
/// otherwise curves consume consecutive points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BasisCurvesTopology {
    pub curve_type: CurveType,
    pub curve_basis: CurveBasis,
    pub wrap: CurveWrap,
    pub curve_vertex_counts: Vec<i32>,
    pub curve_indices: Vec<i32>,
}

impl BasisCurvesTopology {
    /// Create a topology without explicit indices.
    pub fn new(
        curve_type: CurveType,
        curve_basis: CurveBasis,
        wrap: CurveWrap,
        curve_vertex_counts: Vec<i32>,
    ) -> Self {
        Self {
            curve_type,
            curve_basis,
            wrap,
            curve_vertex_counts,
            curve_indices: Vec::new(),
        }
    }

    /// Set explicit curve indices.
    pub fn with_indices(mut self, curve_indices: Vec<i32>) -> Self {
        self.curve_indices = curve_indices;
        self
    }

    pub fn has_indices(&self) -> bool {
        !self.curve_indices.is_empty()
    }

    pub fn num_curves(&self) -> usize {
        self.curve_vertex_counts.len()
    }

    pub fn is_periodic(&self) -> bool {
        self.wrap == CurveWrap::Periodic
    }

    /// Number of points the topology references.
    ///
    /// With explicit indices this is the highest referenced index plus one;
    /// otherwise the sum of the per-curve counts.
    pub fn calculate_needed_number_of_control_points(&self) -> usize {
        if self.has_indices() {
            self.curve_indices
                .iter()
                .copied()
                .max()
                .map_or(0, |max| usize::try_from(max).map_or(0, |m| m + 1))
        } else {
            self.curve_vertex_counts
                .iter()
                .map(|&c| usize::try_from(c).unwrap_or(0))
                .sum()
        }
    }

    /// Whether the topology describes no drawable geometry.
    pub fn is_empty(&self) -> bool {
        self.calculate_needed_number_of_control_points() == 0
    }

    /// Deterministic content id of the defining fields.
    pub fn compute_hash(&self) -> TopologyId {
        let mut hasher = ContentHasher::new("hydrant.basis_curves");
        hasher.write_u8(self.curve_type as u8);
        hasher.write_u8(self.curve_basis as u8);
        hasher.write_u8(self.wrap as u8);
        hasher.write_i32_slice(&self.curve_vertex_counts);
        hasher.write_i32_slice(&self.curve_indices);
        hasher.finish()
    }

    /// Line segments between consecutive control points of every curve.
    ///
    /// Periodic curves get a closing segment from the last point back to
    /// the first.
    pub fn build_line_segment_indices(&self) -> Vec<[i32; 2]> {
        let mut segments = Vec::with_capacity(self.line_segment_count());
        for (offset, count) in self.curve_spans() {
            if count < 2 {
                continue;
            }
            for i in 0..count - 1 {
                segments.push([self.point(offset + i), self.point(offset + i + 1)]);
            }
            if self.is_periodic() && count > 2 {
                segments.push([self.point(offset + count - 1), self.point(offset)]);
            }
        }
        segments
    }

    /// Number of segments [`build_line_segment_indices`](Self::build_line_segment_indices) yields.
    pub fn line_segment_count(&self) -> usize {
        self.curve_spans()
            .map(|(_, count)| match count {
                0 | 1 => 0,
                2 => 1,
                n if self.is_periodic() => n,
                n => n - 1,
            })
            .sum()
    }

    /// Four-point patches for cubic curves.
    ///
    /// Bezier curves advance three points per segment, B-spline and
    /// Catmull-Rom curves advance one. Periodic curves wrap around within
    /// each curve. Linear topologies yield no patches.
    pub fn build_cubic_patch_indices(&self) -> Vec<[i32; 4]> {
        let mut patches = Vec::with_capacity(self.cubic_patch_count());
        if self.curve_type != CurveType::Cubic {
            return patches;
        }
        let vstep = self.curve_basis.vstep();
        for (offset, count) in self.curve_spans() {
            for segment in 0..self.cubic_segments_in_curve(count) {
                let start = segment * vstep;
                let mut patch = [0; 4];
                for (k, slot) in patch.iter_mut().enumerate() {
                    *slot = self.point(offset + (start + k) % count);
                }
                patches.push(patch);
            }
        }
        patches
    }

    /// Number of patches [`build_cubic_patch_indices`](Self::build_cubic_patch_indices) yields.
    pub fn cubic_patch_count(&self) -> usize {
        if self.curve_type != CurveType::Cubic {
            return 0;
        }
        self.curve_spans()
            .map(|(_, count)| self.cubic_segments_in_curve(count))
            .sum()
    }

    fn cubic_segments_in_curve(&self, count: usize) -> usize {
        if count < 4 {
            return 0;
        }
        let vstep = self.curve_basis.vstep();
        if self.is_periodic() {
            count / vstep
        } else {
            (count - 4) / vstep + 1
        }
    }

    /// `(first curve vertex, vertex count)` for each curve.
    fn curve_spans(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.curve_vertex_counts
            .iter()
            .scan(0usize, |offset, &count| {
                let count = usize::try_from(count).unwrap_or(0);
                let span = (*offset, count);
                *offset += count;
                Some(span)
            })
    }

    /// Resolve a curve vertex to a point index.
    fn point(&self, curve_vertex: usize) -> i32 {
        if self.has_indices() {
            self.curve_indices.get(curve_vertex).copied().unwrap_or(0)
        } else {
            curve_vertex as i32
        }
    }
}
