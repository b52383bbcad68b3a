//! Geometric shader keys.
//!
//! A geometric shader is the topology-dependent half of a draw item's shader
//! program. The render index only decides which key a draw item needs and
//! shares one [`GeometricShader`] object per distinct key.

use hydrant_core::CurveBasis;
use hydrant_core::topology::ContentHasher;

/// Primitive assembly a geometric shader expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Two-point line segments.
    Lines,
    /// Four-point cubic patches, tessellated on the GPU.
    CubicPatches,
    /// Indexed triangles.
    Triangles,
}

/// Parameters selecting a geometric shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometricShaderKey {
    BasisCurves {
        basis: CurveBasis,
        /// Normals were found in one of the draw item's primvar ranges.
        authored_normals: bool,
        /// Curves are drawn as refined cubic patches.
        smooth: bool,
    },
    ImagePlane,
}

impl GeometricShaderKey {
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::BasisCurves { smooth: true, .. } => PrimitiveType::CubicPatches,
            Self::BasisCurves { smooth: false, .. } => PrimitiveType::Lines,
            Self::ImagePlane => PrimitiveType::Triangles,
        }
    }

    /// Stable id used to share shaders in the resource registry.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = ContentHasher::new("hydrant.geometric_shader");
        match *self {
            Self::BasisCurves {
                basis,
                authored_normals,
                smooth,
            } => {
                hasher.write_u8(0);
                hasher.write_u8(basis as u8);
                hasher.write_bool(authored_normals);
                hasher.write_bool(smooth);
            }
            Self::ImagePlane => hasher.write_u8(1),
        }
        hasher.finish().0
    }
}

/// A shared geometric shader.
#[derive(Debug, PartialEq, Eq)]
pub struct GeometricShader {
    key: GeometricShaderKey,
    hash: u64,
}

impl GeometricShader {
    pub fn new(key: GeometricShaderKey) -> Self {
        Self {
            key,
            hash: key.compute_hash(),
        }
    }

    pub fn key(&self) -> &GeometricShaderKey {
        &self.key
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.key.primitive_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_hash_by_content() {
        let a = GeometricShaderKey::BasisCurves {
            basis: CurveBasis::BSpline,
            authored_normals: false,
            smooth: true,
        };
        let b = GeometricShaderKey::BasisCurves {
            basis: CurveBasis::BSpline,
            authored_normals: true,
            smooth: true,
        };
        assert_eq!(a.compute_hash(), a.compute_hash());
        assert_ne!(a.compute_hash(), b.compute_hash());
        assert_ne!(a.compute_hash(), GeometricShaderKey::ImagePlane.compute_hash());
    }

    #[test]
    fn primitive_types() {
        let lines = GeometricShaderKey::BasisCurves {
            basis: CurveBasis::Bezier,
            authored_normals: false,
            smooth: false,
        };
        assert_eq!(lines.primitive_type(), PrimitiveType::Lines);
        assert_eq!(
            GeometricShader::new(GeometricShaderKey::ImagePlane).primitive_type(),
            PrimitiveType::Triangles
        );
    }
}
