//! Per-rprim dirty state for one render index.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use hydrant_core::PrimPath;
use parking_lot::RwLock;

use crate::dirty::{CLEAN, DirtyBits};

/// Maps rprim paths to their pending dirty bits.
///
/// Scene delegates push changes through [`ChangeTracker::mark_rprim_dirty`];
/// the render index reads the bits at sync time and stores the residue the
/// drivers could not satisfy.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    rprims: RwLock<HashMap<PrimPath, DirtyBits>>,
    garbage_collection_needed: AtomicBool,
    shader_bindings_version: AtomicU64,
    scene_state_version: AtomicU64,
}

static_assertions::assert_impl_all!(ChangeTracker: Send, Sync);

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an rprim with its initial bits.
    pub fn rprim_inserted(&self, id: &PrimPath, initial: DirtyBits) {
        self.rprims.write().insert(id.clone(), initial);
        self.bump_scene_state();
    }

    /// Stop tracking an rprim.
    pub fn rprim_removed(&self, id: &PrimPath) {
        if self.rprims.write().remove(id).is_none() {
            log::error!("removing untracked rprim {id}");
        }
        self.bump_scene_state();
    }

    /// OR `bits` into the stored mask. Returns `false` for an unknown rprim.
    pub fn mark_rprim_dirty(&self, id: &PrimPath, bits: DirtyBits) -> bool {
        let mut rprims = self.rprims.write();
        match rprims.get_mut(id) {
            Some(stored) => {
                *stored |= bits;
                drop(rprims);
                self.bump_scene_state();
                true
            }
            None => {
                log::error!("marking untracked rprim {id} dirty");
                false
            }
        }
    }

    /// Current bits of an rprim; [`CLEAN`] if unknown.
    pub fn rprim_dirty_bits(&self, id: &PrimPath) -> DirtyBits {
        self.rprims.read().get(id).copied().unwrap_or(CLEAN)
    }

    /// Remove `bits` from the stored mask.
    pub fn clear_rprim_dirty_bits(&self, id: &PrimPath, bits: DirtyBits) {
        if let Some(stored) = self.rprims.write().get_mut(id) {
            *stored &= !bits;
        }
    }

    /// Replace the stored mask.
    pub fn set_rprim_dirty_bits(&self, id: &PrimPath, bits: DirtyBits) {
        if let Some(stored) = self.rprims.write().get_mut(id) {
            *stored = bits;
        }
    }

    pub fn is_rprim_dirty(&self, id: &PrimPath) -> bool {
        self.rprim_dirty_bits(id).is_dirty()
    }

    /// Paths of every rprim with pending bits, sorted.
    pub fn dirty_rprim_ids(&self) -> Vec<PrimPath> {
        let mut ids: Vec<_> = self
            .rprims
            .read()
            .iter()
            .filter(|(_, bits)| bits.is_dirty())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn rprim_count(&self) -> usize {
        self.rprims.read().len()
    }

    // ------------------------------------------------------------------------
    // Render index wide flags
    // ------------------------------------------------------------------------

    /// Request a garbage collection of abandoned shared resources.
    pub fn set_garbage_collection_needed(&self) {
        self.garbage_collection_needed.store(true, Ordering::Release);
    }

    pub fn is_garbage_collection_needed(&self) -> bool {
        self.garbage_collection_needed.load(Ordering::Acquire)
    }

    pub fn clear_garbage_collection_needed(&self) {
        self.garbage_collection_needed.store(false, Ordering::Release);
    }

    /// Note that draw item shader bindings have to be rebuilt.
    pub fn mark_shader_bindings_dirty(&self) {
        self.shader_bindings_version.fetch_add(1, Ordering::AcqRel);
    }

    pub fn shader_bindings_version(&self) -> u64 {
        self.shader_bindings_version.load(Ordering::Acquire)
    }

    /// Incremented on every insertion, removal and successful mark.
    pub fn scene_state_version(&self) -> u64 {
        self.scene_state_version.load(Ordering::Acquire)
    }

    fn bump_scene_state(&self) {
        self.scene_state_version.fetch_add(1, Ordering::AcqRel);
    }
}
