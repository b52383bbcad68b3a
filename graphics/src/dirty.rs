//! Per-rprim dirty bits and the custom bit allocator.

use std::collections::HashMap;
use std::fmt::Write as _;

use bitflags::bitflags;
use hydrant_core::{Token, tokens};
use parking_lot::Mutex;

use crate::error::{GraphicsError, Result};

/// First bit of the range reserved for rprim-type specific flags.
pub const CUSTOM_BITS_BEGIN: u32 = 24;
/// Number of bits in the custom range.
pub const CUSTOM_BITS_COUNT: u32 = u32::BITS - CUSTOM_BITS_BEGIN;

bitflags! {
    /// Attribute categories that changed since the last sync of an rprim.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyBits: u32 {
        /// The requested repr has not been initialized yet.
        const INIT_REPR = 1 << 0;
        /// The rprim changes every frame.
        const VARYING = 1 << 1;
        const DIRTY_PRIM_ID = 1 << 2;
        const DIRTY_EXTENT = 1 << 3;
        const DIRTY_DISPLAY_STYLE = 1 << 4;
        const DIRTY_POINTS = 1 << 5;
        const DIRTY_PRIMVAR = 1 << 6;
        const DIRTY_MATERIAL_ID = 1 << 7;
        const DIRTY_TOPOLOGY = 1 << 8;
        const DIRTY_TRANSFORM = 1 << 9;
        const DIRTY_VISIBILITY = 1 << 10;
        const DIRTY_NORMALS = 1 << 11;
        const DIRTY_DOUBLE_SIDED = 1 << 12;
        const DIRTY_CULL_STYLE = 1 << 13;
        const DIRTY_SUBDIV_TAGS = 1 << 14;
        const DIRTY_WIDTHS = 1 << 15;
        const DIRTY_INSTANCER = 1 << 16;
        const DIRTY_INSTANCE_INDEX = 1 << 17;
        const DIRTY_REPR = 1 << 18;
        const DIRTY_RENDER_TAG = 1 << 19;
        const DIRTY_REFINE_LEVEL = 1 << 20;
        const DIRTY_SURFACE_SHADER = 1 << 21;
        /// A repr was created during this sync.
        const NEW_REPR = 1 << 22;

        /// Range handed out by [`CustomBitAllocator`].
        const CUSTOM_BITS = !((1 << CUSTOM_BITS_BEGIN) - 1);
    }
}

/// Nothing to do.
pub const CLEAN: DirtyBits = DirtyBits::empty();

/// Bits that describe authored scene state, cleared by a successful sync.
pub const ALL_SCENE_DIRTY_BITS: DirtyBits = DirtyBits::from_bits_retain(
    ((1 << CUSTOM_BITS_BEGIN) - 1)
        & !(DirtyBits::INIT_REPR.bits() | DirtyBits::VARYING.bits() | DirtyBits::NEW_REPR.bits()),
);

impl Default for DirtyBits {
    fn default() -> Self {
        CLEAN
    }
}

impl DirtyBits {
    /// Any bit other than the varying marker.
    pub fn is_dirty(self) -> bool {
        !self.difference(Self::VARYING).is_empty()
    }

    pub fn is_topology_dirty(self) -> bool {
        self.contains(Self::DIRTY_TOPOLOGY)
    }

    pub fn is_refine_level_dirty(self) -> bool {
        self.contains(Self::DIRTY_REFINE_LEVEL)
    }

    /// Whether any bit that invalidates primvar data is set.
    pub fn is_any_primvar_dirty(self) -> bool {
        self.intersects(
            Self::DIRTY_POINTS | Self::DIRTY_NORMALS | Self::DIRTY_WIDTHS | Self::DIRTY_PRIMVAR,
        )
    }

    /// Whether the named primvar is dirty.
    ///
    /// `points`, `normals` and `widths` have dedicated bits; every other name
    /// is covered by [`DirtyBits::DIRTY_PRIMVAR`].
    pub fn is_primvar_dirty(self, name: &Token) -> bool {
        let bit = if *name == tokens::POINTS {
            Self::DIRTY_POINTS
        } else if *name == tokens::NORMALS {
            Self::DIRTY_NORMALS
        } else if *name == tokens::WIDTHS {
            Self::DIRTY_WIDTHS
        } else {
            Self::DIRTY_PRIMVAR
        };
        self.contains(bit)
    }

    /// Bits in the custom range.
    pub fn custom(self) -> Self {
        self.intersection(Self::CUSTOM_BITS)
    }

    /// Human readable dump, e.g. `DIRTY_POINTS | DIRTY_TOPOLOGY | custom(0x1000000)`.
    pub fn describe(self) -> String {
        if self.is_empty() {
            return "CLEAN".to_string();
        }
        let mut out = String::new();
        for (name, _) in self.difference(Self::CUSTOM_BITS).iter_names() {
            if !out.is_empty() {
                out.push_str(" | ");
            }
            out.push_str(name);
        }
        let custom = self.custom();
        if !custom.is_empty() {
            if !out.is_empty() {
                out.push_str(" | ");
            }
            let _ = write!(out, "custom({:#x})", custom.bits());
        }
        out
    }
}

// ============================================================================
// Custom bit allocation
// ============================================================================

/// Hands out bits from the custom range to rprim configurations.
///
/// Claims are keyed by a configuration name. Registering the same key again
/// returns the bits it already owns. Claims are never released.
#[derive(Debug, Default)]
pub struct CustomBitAllocator {
    inner: Mutex<AllocatorState>,
}

#[derive(Debug, Default)]
struct AllocatorState {
    next: u32,
    claims: HashMap<String, DirtyBits>,
}

impl CustomBitAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `count` consecutive custom bits for `config_key`.
    pub fn register(&self, config_key: &str, count: u32) -> Result<DirtyBits> {
        let mut state = self.inner.lock();
        if let Some(bits) = state.claims.get(config_key) {
            if bits.bits().count_ones() != count {
                log::error!(
                    "custom bits for {config_key} already claimed with {} bits, {count} requested",
                    bits.bits().count_ones()
                );
            }
            return Ok(*bits);
        }

        if state.next + count > CUSTOM_BITS_COUNT {
            return Err(GraphicsError::CustomBitsExhausted {
                key: config_key.to_string(),
                requested: count,
            });
        }

        let mut bits = CLEAN;
        for i in 0..count {
            bits |= DirtyBits::from_bits_retain(1 << (CUSTOM_BITS_BEGIN + state.next + i));
        }
        state.next += count;
        state.claims.insert(config_key.to_string(), bits);
        log::debug!("claimed {} for {config_key}", bits.describe());
        Ok(bits)
    }

    /// Bits currently owned by `config_key`.
    pub fn claimed(&self, config_key: &str) -> Option<DirtyBits> {
        self.inner.lock().claims.get(config_key).copied()
    }

    /// Union of every claimed bit.
    pub fn in_use(&self) -> DirtyBits {
        self.inner
            .lock()
            .claims
            .values()
            .fold(CLEAN, |acc, bits| acc | *bits)
    }
}

/// Split a claim into its individual bits, lowest first.
pub fn split_bits(bits: DirtyBits) -> impl Iterator<Item = DirtyBits> {
    let raw = bits.bits();
    (0..u32::BITS)
        .filter(move |i| raw & (1 << i) != 0)
        .map(|i| DirtyBits::from_bits_retain(1 << i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_range_is_disjoint_from_vocabulary() {
        let vocabulary = DirtyBits::all().difference(DirtyBits::CUSTOM_BITS);
        assert!(!vocabulary.intersects(DirtyBits::CUSTOM_BITS));
        assert!(!ALL_SCENE_DIRTY_BITS.intersects(DirtyBits::CUSTOM_BITS));
        assert!(!ALL_SCENE_DIRTY_BITS.contains(DirtyBits::INIT_REPR));
        assert!(ALL_SCENE_DIRTY_BITS.contains(DirtyBits::DIRTY_TOPOLOGY));
    }

    #[test]
    fn primvar_bits_by_name() {
        let bits = DirtyBits::DIRTY_WIDTHS;
        assert!(bits.is_primvar_dirty(&tokens::WIDTHS));
        assert!(!bits.is_primvar_dirty(&tokens::POINTS));
        assert!(!bits.is_primvar_dirty(&Token::new("displayColor")));
        assert!(DirtyBits::DIRTY_PRIMVAR.is_primvar_dirty(&Token::new("displayColor")));
        assert!(bits.is_any_primvar_dirty());
    }

    #[test]
    fn varying_alone_is_not_dirty() {
        assert!(!DirtyBits::VARYING.is_dirty());
        assert!(!CLEAN.is_dirty());
        assert!(DirtyBits::DIRTY_REPR.is_dirty());
    }

    #[test]
    fn allocator_is_idempotent_per_key() {
        let allocator = CustomBitAllocator::new();
        let curves = allocator.register("basisCurves", 2).unwrap();
        assert_eq!(curves.bits().count_ones(), 2);
        assert_eq!(curves, curves.custom());
        assert_eq!(allocator.register("basisCurves", 2).unwrap(), curves);

        let other = allocator.register("points", 1).unwrap();
        assert!(!other.intersects(curves));
        assert_eq!(allocator.in_use(), curves | other);
    }

    #[test]
    fn allocator_exhaustion() {
        let allocator = CustomBitAllocator::new();
        allocator.register("a", CUSTOM_BITS_COUNT - 1).unwrap();
        let err = allocator.register("b", 2).unwrap_err();
        assert!(matches!(err, GraphicsError::CustomBitsExhausted { requested: 2, .. }));
        assert!(allocator.register("c", 1).is_ok());
    }

    #[test]
    fn clearing_keeps_custom_bits() {
        let allocator = CustomBitAllocator::new();
        let custom = allocator.register("basisCurves", 2).unwrap();
        let bits = DirtyBits::DIRTY_POINTS | custom;
        assert_eq!(bits & !ALL_SCENE_DIRTY_BITS, custom);
        assert_eq!(split_bits(custom).count(), 2);
    }

    #[test]
    fn describe_lists_names() {
        assert_eq!(CLEAN.describe(), "CLEAN");
        let text = (DirtyBits::DIRTY_POINTS | DirtyBits::from_bits_retain(1 << 24)).describe();
        assert_eq!(text, "DIRTY_POINTS | custom(0x1000000)");
    }
}
