//! Polygonal mesh topology.

use super::{ContentHasher, TopologyId};

/// Subdivision scheme authored on the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubdivisionScheme {
    #[default]
    CatmullClark,
    Loop,
    Bilinear,
    /// Polygons are drawn as authored.
    None,
}

/// Winding order of face vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    RightHanded,
    LeftHanded,
}

/// Faces described by per-face vertex counts and a flat vertex index list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MeshTopology {
    pub scheme: SubdivisionScheme,
    pub orientation: Orientation,
    pub face_vertex_counts: Vec<i32>,
    pub face_vertex_indices: Vec<i32>,
    /// Faces that are not drawn.
    pub hole_indices: Vec<i32>,
}

impl MeshTopology {
    /// Create a topology with the default scheme and orientation.
    pub fn new(face_vertex_counts: Vec<i32>, face_vertex_indices: Vec<i32>) -> Self {
        Self {
            face_vertex_counts,
            face_vertex_indices,
            ..Self::default()
        }
    }

    /// Set the subdivision scheme.
    pub fn with_scheme(mut self, scheme: SubdivisionScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the winding order.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the hole faces.
    pub fn with_holes(mut self, hole_indices: Vec<i32>) -> Self {
        self.hole_indices = hole_indices;
        self
    }

    pub fn num_faces(&self) -> usize {
        self.face_vertex_counts.len()
    }

    /// Highest referenced point index plus one.
    pub fn num_points(&self) -> usize {
        self.face_vertex_indices
            .iter()
            .copied()
            .max()
            .map_or(0, |max| usize::try_from(max).map_or(0, |m| m + 1))
    }

    /// Whether the topology describes no drawable geometry.
    pub fn is_empty(&self) -> bool {
        self.face_vertex_counts.is_empty() || self.face_vertex_indices.is_empty()
    }

    /// Deterministic content id of the defining fields.
    pub fn compute_hash(&self) -> TopologyId {
        let mut hasher = ContentHasher::new("hydrant.mesh");
        hasher.write_u8(self.scheme as u8);
        hasher.write_u8(self.orientation as u8);
        hasher.write_i32_slice(&self.face_vertex_counts);
        hasher.write_i32_slice(&self.face_vertex_indices);
        hasher.write_i32_slice(&self.hole_indices);
        hasher.finish()
    }

    /// Fan-triangulate every face.
    ///
    /// Returns the triangles (wound counter-clockwise for right-handed
    /// meshes) and the number of faces that were skipped because they had
    /// fewer than three vertices or ran past the end of the index list.
    /// Hole faces are dropped without counting as skipped.
    pub fn triangulate(&self) -> (Vec<[i32; 3]>, usize) {
        let mut triangles = Vec::with_capacity(self.triangle_count());
        let mut skipped = 0;
        let mut offset = 0usize;
        for (face, &count) in self.face_vertex_counts.iter().enumerate() {
            let count = usize::try_from(count).unwrap_or(0);
            let start = offset;
            offset += count;
            if self.is_hole(face) {
                continue;
            }
            let Some(verts) = self.face_vertex_indices.get(start..start + count) else {
                log::debug!(
                    "face {face} indexes {start}..{} past {} face vertex indices",
                    start + count,
                    self.face_vertex_indices.len()
                );
                skipped += 1;
                continue;
            };
            if count < 3 {
                log::debug!("face {face} has {count} vertices");
                skipped += 1;
                continue;
            }
            for i in 1..count - 1 {
                let tri = match self.orientation {
                    Orientation::RightHanded => [verts[0], verts[i], verts[i + 1]],
                    Orientation::LeftHanded => [verts[0], verts[i + 1], verts[i]],
                };
                triangles.push(tri);
            }
        }
        (triangles, skipped)
    }

    /// Upper bound of the triangle count, ignoring holes.
    pub fn triangle_count(&self) -> usize {
        self.face_vertex_counts
            .iter()
            .map(|&c| usize::try_from(c).unwrap_or(0).saturating_sub(2))
            .sum()
    }

    fn is_hole(&self, face: usize) -> bool {
        self.hole_indices
            .iter()
            .any(|&h| usize::try_from(h).is_ok_and(|h| h == face))
    }
}
