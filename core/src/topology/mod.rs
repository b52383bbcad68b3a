//! Topology descriptions and their content ids.
//!
//! Topologies are immutable descriptions of connectivity. Two primitives whose
//! topologies produce the same [`TopologyId`] share one topology object and one
//! index buffer in the resource registry, so the id must depend only on the
//! defining fields and be stable across runs and threads.
//!
//! - [`BasisCurvesTopology`] - curve counts, basis and wrap
//! - [`MeshTopology`] - face counts and face-vertex indices

mod basis_curves;
mod mesh;

pub use basis_curves::{BasisCurvesTopology, CurveBasis, CurveType, CurveWrap};
pub use mesh::{MeshTopology, Orientation, SubdivisionScheme};

use std::fmt;

use crate::token::Token;

/// 64-bit content id of a topology, optionally folded with auxiliary state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TopologyId(pub u64);

impl TopologyId {
    /// Fold a flag that changes the derived resources (e.g. refinement).
    pub fn combine_flag(self, flag: bool) -> Self {
        let mut hasher = ContentHasher::new("hydrant.topology.flag");
        hasher.write_u64(self.0);
        hasher.write_bool(flag);
        hasher.finish()
    }

    /// Fold a role token, used to key index ranges per index kind.
    pub fn combine_token(self, token: &Token) -> Self {
        let mut hasher = ContentHasher::new("hydrant.topology.token");
        hasher.write_u64(self.0);
        hasher.write_str(token.as_str());
        hasher.finish()
    }
}

impl fmt::Debug for TopologyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TopologyId({:#018x})", self.0)
    }
}

/// Streams typed fields into a BLAKE3 digest and truncates it to 64 bits.
///
/// Every variable-length field is length-prefixed so adjacent fields cannot
/// alias each other.
pub struct ContentHasher {
    inner: blake3::Hasher,
}

impl ContentHasher {
    /// Start a digest in the given domain.
    pub fn new(domain: &str) -> Self {
        let mut inner = blake3::Hasher::new();
        inner.update(&(domain.len() as u64).to_le_bytes());
        inner.update(domain.as_bytes());
        Self { inner }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.inner.update(&v.to_le_bytes());
    }

    pub fn write_u8(&mut self, v: u8) {
        self.inner.update(&[v]);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.inner.update(s.as_bytes());
    }

    pub fn write_i32_slice(&mut self, values: &[i32]) {
        self.write_u64(values.len() as u64);
        self.inner.update(bytemuck::cast_slice(values));
    }

    /// Finish the digest.
    pub fn finish(&self) -> TopologyId {
        let digest = self.inner.finalize();
        let mut id = [0u8; 8];
        id.copy_from_slice(&digest.as_bytes()[..8]);
        TopologyId(u64::from_le_bytes(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokens;

    #[test]
    fn combine_is_deterministic_and_sensitive() {
        let id = TopologyId(42);
        assert_eq!(id.combine_flag(true), id.combine_flag(true));
        assert_ne!(id.combine_flag(true), id.combine_flag(false));
        assert_ne!(
            id.combine_token(&tokens::INDICES),
            id.combine_token(&tokens::HULL_INDICES)
        );
    }

    #[test]
    fn length_prefix_separates_fields() {
        let mut a = ContentHasher::new("test");
        a.write_i32_slice(&[1, 2]);
        a.write_i32_slice(&[3]);
        let mut b = ContentHasher::new("test");
        b.write_i32_slice(&[1]);
        b.write_i32_slice(&[2, 3]);
        assert_ne!(a.finish(), b.finish());
    }
}
