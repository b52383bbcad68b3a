//! The render index: owns rprims and drives their sync.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use hydrant_core::{PrimPath, Token};
use parking_lot::{Mutex, RwLock};

use crate::basis_curves::BasisCurves;
use crate::change_tracker::ChangeTracker;
use crate::config::RenderConfig;
use crate::dirty::{CustomBitAllocator, DirtyBits};
use crate::error::Result;
use crate::image_plane::ImagePlane;
use crate::repr::{BasisCurvesReprDesc, ImagePlaneReprDesc, ReprConfigs};
use crate::resource_registry::ResourceRegistry;
use crate::rprim::{Rprim, SyncContext};
use crate::scene_delegate::SceneDelegate;

/// Rprim types the render index can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RprimKind {
    BasisCurves,
    ImagePlane,
}

/// Outcome of one [`RenderIndex::sync_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Rprims synced successfully.
    pub synced: usize,
    /// Rprims whose sync returned an error. They keep their dirty bits.
    pub failed: usize,
    /// Rprims with nothing to do.
    pub clean: usize,
}

type RprimCell = Mutex<Box<dyn Rprim>>;

/// Rprims, their change tracker and the resources they share.
pub struct RenderIndex {
    config: RenderConfig,
    reprs: RwLock<ReprConfigs>,
    tracker: ChangeTracker,
    registry: ResourceRegistry,
    custom_bits: CustomBitAllocator,
    rprims: RwLock<HashMap<PrimPath, RprimCell>>,
    next_prim_id: AtomicI32,
}

static_assertions::assert_impl_all!(RenderIndex: Send, Sync);

impl RenderIndex {
    pub fn new(config: RenderConfig) -> Self {
        log::debug!("creating render index with {config:?}");
        let reprs = ReprConfigs::with_defaults(config.force_refined_curves);
        Self {
            config,
            reprs: RwLock::new(reprs),
            tracker: ChangeTracker::new(),
            registry: ResourceRegistry::new(),
            custom_bits: CustomBitAllocator::new(),
            rprims: RwLock::new(HashMap::new()),
            next_prim_id: AtomicI32::new(0),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn change_tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn resource_registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Snapshot of the repr configuration.
    pub fn repr_configs(&self) -> ReprConfigs {
        self.reprs.read().clone()
    }

    /// Configure a basis curves repr for every curves rprim of this index.
    pub fn configure_basis_curves_repr(&self, name: Token, desc: BasisCurvesReprDesc) {
        self.reprs
            .write()
            .configure_basis_curves(name, desc, self.config.force_refined_curves);
    }

    /// Configure an image plane repr for every image plane of this index.
    pub fn configure_image_plane_repr(&self, name: Token, desc: ImagePlaneReprDesc) {
        self.reprs.write().image_plane.append(name, vec![desc]);
    }

    // ------------------------------------------------------------------------
    // Rprims
    // ------------------------------------------------------------------------

    /// Create an rprim of `kind` at `path` with its initial dirty bits.
    ///
    /// Inserting a path twice keeps the existing rprim.
    pub fn insert_rprim(&self, kind: RprimKind, path: PrimPath) -> Result<()> {
        let mut rprims = self.rprims.write();
        if rprims.contains_key(&path) {
            log::warn!("{path} is already in the render index");
            return Ok(());
        }

        let prim_id = self.next_prim_id.fetch_add(1, Ordering::Relaxed);
        let rprim: Box<dyn Rprim> = match kind {
            RprimKind::BasisCurves => {
                let bits = BasisCurves::claim_custom_bits(&self.custom_bits)?;
                Box::new(BasisCurves::new(path.clone(), prim_id, bits))
            }
            RprimKind::ImagePlane => Box::new(ImagePlane::new(path.clone(), prim_id)),
        };

        log::trace!("inserting {kind:?} {path}");
        self.tracker.rprim_inserted(&path, rprim.initial_dirty_bits());
        rprims.insert(path, Mutex::new(rprim));
        Ok(())
    }

    /// Remove the rprim at `path`. Returns whether it existed.
    pub fn remove_rprim(&self, path: &PrimPath) -> bool {
        let removed = self.rprims.write().remove(path).is_some();
        if removed {
            self.tracker.rprim_removed(path);
            self.tracker.set_garbage_collection_needed();
        }
        removed
    }

    pub fn contains_rprim(&self, path: &PrimPath) -> bool {
        self.rprims.read().contains_key(path)
    }

    pub fn rprim_count(&self) -> usize {
        self.rprims.read().len()
    }

    /// Sorted paths of every rprim.
    pub fn rprim_ids(&self) -> Vec<PrimPath> {
        let mut ids: Vec<_> = self.rprims.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run `f` with read access to the rprim at `path`.
    pub fn with_rprim<R>(&self, path: &PrimPath, f: impl FnOnce(&dyn Rprim) -> R) -> Option<R> {
        let rprims = self.rprims.read();
        let rprim = rprims.get(path)?.lock();
        Some(f(&**rprim))
    }

    // ------------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------------

    /// Sync every rprim that has dirty bits or has not built `repr` yet.
    ///
    /// Rprims are synced independently; one failing rprim is logged, keeps
    /// its dirty bits and does not stop the others. Large passes are split
    /// across threads.
    pub fn sync_all(&self, delegate: &dyn SceneDelegate, repr: &Token) -> SyncStats {
        hydrant_core::profile_function!();
        let reprs = self.reprs.read();
        let rprims = self.rprims.read();
        let ctx = SyncContext {
            delegate,
            registry: &self.registry,
            tracker: &self.tracker,
            config: &self.config,
            reprs: &*reprs,
        };

        let mut work: Vec<(&PrimPath, &RprimCell)> = Vec::new();
        let mut clean = 0;
        for (path, cell) in rprims.iter() {
            let bits = self.tracker.rprim_dirty_bits(path);
            let needs_repr = {
                let rprim = cell.lock();
                rprim.repr(repr).is_none() && !rprim.dirty_bits_mask(&reprs, repr).is_empty()
            };
            if bits.is_dirty() || needs_repr {
                work.push((path, cell));
            } else {
                clean += 1;
            }
        }

        let synced = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let sync_one = |path: &PrimPath, cell: &RprimCell| {
            let mut rprim = cell.lock();
            let original = self.tracker.rprim_dirty_bits(path);
            let mut bits = original;
            rprim.init_repr(&reprs, repr, &mut bits);
            match rprim.sync(&ctx, repr, &mut bits) {
                Ok(()) => {
                    self.tracker.set_rprim_dirty_bits(path, bits);
                    synced.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    log::error!("{path}: sync of {repr} failed: {err}");
                    self.tracker
                        .set_rprim_dirty_bits(path, original | bits.difference(DirtyBits::NEW_REPR));
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        };

        let count = work.len();
        hydrant_core::profile_plot!("dirty_rprims", count);
        if count < self.config.parallel_threshold || count < self.config.min_batch_size {
            for &(path, cell) in &work {
                sync_one(path, cell);
            }
        } else {
            let threads = self.config.effective_threads().max(1);
            let batch_size = (count / (threads * 4))
                .max(self.config.min_batch_size)
                .max(1);
            let sync_one = &sync_one;
            std::thread::scope(|scope| {
                for chunk in work.chunks(batch_size) {
                    scope.spawn(move || {
                        for &(path, cell) in chunk {
                            sync_one(path, cell);
                        }
                    });
                }
            });
        }

        let stats = SyncStats {
            synced: synced.into_inner(),
            failed: failed.into_inner(),
            clean,
        };
        log::debug!(
            "synced {repr}: {} rprims, {} failed, {} clean{}",
            stats.synced,
            stats.failed,
            stats.clean,
            if self.tracker.is_garbage_collection_needed() {
                ", garbage collection requested"
            } else {
                ""
            }
        );
        stats
    }

    /// Drop shared resources no rprim references any more, if a sync pass
    /// or a removal asked for it. Returns the number of entries dropped.
    pub fn collect_garbage(&self) -> usize {
        if !self.tracker.is_garbage_collection_needed() {
            return 0;
        }
        self.tracker.clear_garbage_collection_needed();
        let removed = self.registry.garbage_collect();
        log::debug!("garbage collection dropped {removed} shared entries");
        removed
    }
}

impl std::fmt::Debug for RenderIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderIndex")
            .field("config", &self.config)
            .field("rprims", &self.rprim_count())
            .field("registry", &self.registry)
            .finish()
    }
}
