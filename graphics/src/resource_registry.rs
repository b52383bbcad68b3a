//! Shared resources of one render index.
//!
//! The registry owns the instance tables through which rprims share
//! topologies, index ranges and geometric shaders by content id, allocates
//! buffer array ranges, and queues buffer sources until [`ResourceRegistry::commit`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use hydrant_core::{BasisCurvesTopology, MeshTopology, Token, TopologyId};
use parking_lot::Mutex;

use crate::buffer::{
    BufferArrayRange, BufferSource, BufferSourceHandle, BufferSpec, add_buffer_specs,
};
use crate::instance::{InstanceGuard, InstanceRegistry};
use crate::shader_key::{GeometricShader, GeometricShaderKey};

/// Guard over a shared basis curves topology entry.
pub type BasisCurvesTopologyInstance<'a> = InstanceGuard<'a, Arc<BasisCurvesTopology>>;
/// Guard over a shared mesh topology entry.
pub type MeshTopologyInstance<'a> = InstanceGuard<'a, Arc<MeshTopology>>;
/// Guard over a shared index range entry.
pub type RangeInstance<'a> = InstanceGuard<'a, Arc<BufferArrayRange>>;

struct PendingSource {
    range: Arc<BufferArrayRange>,
    source: BufferSourceHandle,
}

/// Result of one [`ResourceRegistry::commit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Sources resolved and staged.
    pub resolved: usize,
    /// Sources dropped because their range was invalidated or they failed.
    pub skipped: usize,
    /// Total bytes staged.
    pub staged_bytes: usize,
}

/// Instance tables, range allocation and the pending source queue.
#[derive(Default)]
pub struct ResourceRegistry {
    basis_curves_topologies: InstanceRegistry<Arc<BasisCurvesTopology>>,
    basis_curves_index_ranges: InstanceRegistry<Arc<BufferArrayRange>>,
    mesh_topologies: InstanceRegistry<Arc<MeshTopology>>,
    mesh_index_ranges: InstanceRegistry<Arc<BufferArrayRange>>,
    geometric_shaders: InstanceRegistry<Arc<GeometricShader>>,

    pending: Mutex<Vec<PendingSource>>,
    next_range_id: AtomicU64,

    allocations: AtomicUsize,
    topology_registrations: AtomicUsize,
    index_range_registrations: AtomicUsize,
}

static_assertions::assert_impl_all!(ResourceRegistry: Send, Sync);

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Instance tables
    // ------------------------------------------------------------------------

    /// Lock the shared basis curves topology entry for `id`.
    pub fn register_basis_curves_topology<R>(
        &self,
        id: TopologyId,
        f: impl FnOnce(&mut BasisCurvesTopologyInstance<'_>) -> R,
    ) -> R {
        self.topology_registrations.fetch_add(1, Ordering::Relaxed);
        self.basis_curves_topologies.register(id.0, f)
    }

    /// Lock the shared curve index range entry for `(id, index_token)`.
    pub fn register_basis_curves_index_range<R>(
        &self,
        id: TopologyId,
        index_token: &Token,
        f: impl FnOnce(&mut RangeInstance<'_>) -> R,
    ) -> R {
        self.index_range_registrations.fetch_add(1, Ordering::Relaxed);
        self.basis_curves_index_ranges
            .register(id.combine_token(index_token).0, f)
    }

    /// Lock the shared mesh topology entry for `id`.
    pub fn register_mesh_topology<R>(
        &self,
        id: TopologyId,
        f: impl FnOnce(&mut MeshTopologyInstance<'_>) -> R,
    ) -> R {
        self.topology_registrations.fetch_add(1, Ordering::Relaxed);
        self.mesh_topologies.register(id.0, f)
    }

    /// Lock the shared mesh index range entry for `(id, index_token)`.
    pub fn register_mesh_index_range<R>(
        &self,
        id: TopologyId,
        index_token: &Token,
        f: impl FnOnce(&mut RangeInstance<'_>) -> R,
    ) -> R {
        self.index_range_registrations.fetch_add(1, Ordering::Relaxed);
        self.mesh_index_ranges
            .register(id.combine_token(index_token).0, f)
    }

    /// Shared geometric shader for `key`, created on first request.
    pub fn register_geometric_shader(&self, key: GeometricShaderKey) -> Arc<GeometricShader> {
        let shader = Arc::new(GeometricShader::new(key));
        let hash = shader.hash();
        self.geometric_shaders.register(hash, |instance| {
            if let Some(shared) = instance.value() {
                return Arc::clone(shared);
            }
            log::trace!("new geometric shader {key:?}");
            instance.set_value(Arc::clone(&shader));
            shader
        })
    }

    // ------------------------------------------------------------------------
    // Ranges and sources
    // ------------------------------------------------------------------------

    /// Allocate a fresh range with one resource per spec.
    pub fn allocate_non_uniform_buffer_array_range(
        &self,
        role: Token,
        specs: Vec<BufferSpec>,
    ) -> Arc<BufferArrayRange> {
        let id = self.next_range_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.allocations.fetch_add(1, Ordering::Relaxed);
        log::trace!("allocating {role} range {id} with {} buffers", specs.len());
        Arc::new(BufferArrayRange::new(id, role, specs))
    }

    /// Queue `sources` for `range`.
    ///
    /// The first queued source fixes the element count of an unsized range.
    /// Sources that disagree with the fixed count are reported and dropped.
    pub fn add_sources(&self, range: &Arc<BufferArrayRange>, sources: Vec<BufferSourceHandle>) {
        if sources.is_empty() {
            return;
        }
        if !range.is_valid() {
            log::error!(
                "dropping {} sources queued on invalid range {}",
                sources.len(),
                range.id()
            );
            return;
        }

        let mut specs = Vec::new();
        add_buffer_specs(&mut specs, &sources);
        range.ensure_resources(&specs);

        let mut pending = self.pending.lock();
        for source in sources {
            if let Err(err) = range.reserve_elements(source.name(), source.num_elements()) {
                log::warn!("{err}");
                continue;
            }
            pending.push(PendingSource {
                range: Arc::clone(range),
                source,
            });
        }
    }

    /// Queue a single source for `range`.
    pub fn add_source(&self, range: &Arc<BufferArrayRange>, source: BufferSourceHandle) {
        self.add_sources(range, vec![source]);
    }

    /// Resolve every queued source in order and stage its bytes.
    pub fn commit(&self) -> CommitStats {
        hydrant_core::profile_function!();
        let pending = std::mem::take(&mut *self.pending.lock());
        let mut stats = CommitStats::default();

        for PendingSource { range, source } in pending {
            if !range.is_valid() {
                stats.skipped += 1;
                continue;
            }
            match source.resolve() {
                Ok(bytes) => {
                    stats.resolved += 1;
                    stats.staged_bytes += bytes.len();
                    range.stage(source.name(), bytes);
                }
                Err(err) => {
                    log::error!("failed to resolve {} for range {}: {err}", source.name(), range.id());
                    stats.skipped += 1;
                }
            }
        }

        log::debug!(
            "committed {} sources ({} bytes), skipped {}",
            stats.resolved,
            stats.staged_bytes,
            stats.skipped
        );
        stats
    }

    /// Drop shared entries no rprim references anymore. Returns the number
    /// of entries removed.
    pub fn garbage_collect(&self) -> usize {
        hydrant_core::profile_function!();
        let removed = self.basis_curves_topologies.garbage_collect()
            + self.basis_curves_index_ranges.garbage_collect()
            + self.mesh_topologies.garbage_collect()
            + self.mesh_index_ranges.garbage_collect()
            + self.geometric_shaders.garbage_collect();
        log::debug!("garbage collected {removed} shared resources");
        removed
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    /// Number of ranges allocated so far.
    pub fn allocation_count(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Number of sources waiting for [`commit`](Self::commit).
    pub fn pending_source_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of topology lookups so far, shared or not.
    pub fn topology_registration_count(&self) -> usize {
        self.topology_registrations.load(Ordering::Relaxed)
    }

    /// Number of index range lookups so far, shared or not.
    pub fn index_range_registration_count(&self) -> usize {
        self.index_range_registrations.load(Ordering::Relaxed)
    }

    /// Number of live shared topologies.
    pub fn shared_topology_count(&self) -> usize {
        self.basis_curves_topologies.len() + self.mesh_topologies.len()
    }

    /// Number of live shared index ranges.
    pub fn shared_index_range_count(&self) -> usize {
        self.basis_curves_index_ranges.len() + self.mesh_index_ranges.len()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("allocations", &self.allocation_count())
            .field("pending", &self.pending_source_count())
            .field("topologies", &self.shared_topology_count())
            .field("index_ranges", &self.shared_index_range_count())
            .finish()
    }
}
