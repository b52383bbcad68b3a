//! The interface through which rprims pull authored scene data.

use hydrant_core::{BasisCurvesTopology, MeshTopology, PrimPath, Token, Value};

/// How a primvar varies over a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// One value for the whole primitive.
    Constant,
    /// One value per face or curve.
    Uniform,
    /// One value per point, interpolated linearly.
    Varying,
    /// One value per point, interpolated with the primitive's basis.
    Vertex,
    /// One value per face corner.
    FaceVarying,
}

/// Source of authored data for the rprims of a render index.
///
/// Rprims call into the delegate from sync worker threads, so implementations
/// must be `Send + Sync`. Missing data is reported as [`Value::Empty`] or an
/// empty list, never as an error.
pub trait SceneDelegate: Send + Sync {
    /// Topology of a basis curves rprim.
    fn basis_curves_topology(&self, id: &PrimPath) -> BasisCurvesTopology;

    /// Topology of a mesh-backed rprim such as an image plane.
    fn mesh_topology(&self, id: &PrimPath) -> MeshTopology;

    /// Names of the primvars with the given interpolation.
    fn primvar_names(&self, id: &PrimPath, interpolation: Interpolation) -> Vec<Token>;

    /// Current value of a primvar or attribute.
    fn get(&self, id: &PrimPath, name: &Token) -> Value;

    /// Requested refinement level. Zero draws the control hull.
    fn refine_level(&self, _id: &PrimPath) -> i32 {
        0
    }

    fn visible(&self, _id: &PrimPath) -> bool {
        true
    }

    /// Row-major local to world matrix.
    fn transform(&self, _id: &PrimPath) -> [f64; 16] {
        IDENTITY
    }

    /// Object space bounds as `[min, max]`.
    fn extent(&self, _id: &PrimPath) -> Option<[[f32; 3]; 2]> {
        None
    }

    /// Number of nested instancers above the rprim.
    fn instancer_levels(&self, _id: &PrimPath) -> usize {
        0
    }

    /// Primvar names authored on the instancer at `level`.
    fn instance_primvar_names(&self, _id: &PrimPath, _level: usize) -> Vec<Token> {
        Vec::new()
    }

    /// Value of an instancer primvar at `level`.
    fn instance_primvar(&self, _id: &PrimPath, _level: usize, _name: &Token) -> Value {
        Value::Empty
    }
}

/// The identity matrix.
pub const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];
