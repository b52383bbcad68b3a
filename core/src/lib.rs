//! # Hydrant Core
//!
//! Scene-facing data types for the Hydrant render index:
//! - [`Token`] - cheap comparable names for attributes and roles
//! - [`PrimPath`] - primitive identity
//! - [`Value`] - variant values fetched from scene delegates
//! - [`topology`] - basis curves and mesh topologies with content ids
//! - [`profiling`] - optional Tracy instrumentation

pub mod path;
pub mod profiling;
pub mod token;
pub mod topology;
pub mod value;

pub use path::PrimPath;
pub use token::{Token, tokens};
pub use topology::{
    BasisCurvesTopology, CurveBasis, CurveType, CurveWrap, MeshTopology, TopologyId,
};
pub use value::{ComponentType, TupleType, Value};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
