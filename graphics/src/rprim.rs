//! The rprim interface and the sync steps shared by every rprim type.

use std::sync::Arc;

use hydrant_core::{PrimPath, Token, Value, tokens};

use crate::buffer::{BufferArrayRange, BufferSourceHandle, ValueBufferSource, add_buffer_specs};
use crate::change_tracker::ChangeTracker;
use crate::config::RenderConfig;
use crate::dirty::DirtyBits;
use crate::draw_item::{DrawingCoord, RprimSharedData};
use crate::error::Result;
use crate::repr::{Repr, ReprConfigs, ReprList, find_repr};
use crate::resource_registry::ResourceRegistry;
use crate::scene_delegate::{Interpolation, SceneDelegate};

/// Everything an rprim may touch while it syncs.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    pub delegate: &'a dyn SceneDelegate,
    pub registry: &'a ResourceRegistry,
    pub tracker: &'a ChangeTracker,
    pub config: &'a RenderConfig,
    pub reprs: &'a ReprConfigs,
}

/// A renderable scene primitive.
pub trait Rprim: Send {
    fn id(&self) -> &PrimPath;

    /// Bits set when the rprim is inserted, forcing a full first sync.
    fn initial_dirty_bits(&self) -> DirtyBits;

    /// Add the bits implied by `bits`. Never removes a bit.
    fn propagate_dirty_bits(&self, bits: DirtyBits) -> DirtyBits;

    /// Prepare the repr named `repr` ahead of [`Rprim::sync`]. Types that
    /// build their reprs lazily inside `sync` keep the default.
    fn init_repr(&mut self, _reprs: &ReprConfigs, _repr: &Token, bits: &mut DirtyBits) {
        bits.remove(DirtyBits::INIT_REPR);
    }

    /// Bits the repr named `repr` depends on.
    fn dirty_bits_mask(&self, reprs: &ReprConfigs, repr: &Token) -> DirtyBits;

    /// Bring the repr named `repr` up to date and clear the bits satisfied.
    fn sync(&mut self, ctx: &SyncContext<'_>, repr: &Token, bits: &mut DirtyBits) -> Result<()>;

    fn repr(&self, name: &Token) -> Option<&Repr>;

    fn shared_data(&self) -> &Arc<RprimSharedData>;
}

/// State and sync steps common to every rprim type.
#[derive(Debug)]
pub struct RprimBase {
    id: PrimPath,
    prim_id: i32,
    shared: Arc<RprimSharedData>,
    reprs: ReprList,
}

impl RprimBase {
    pub fn new(id: PrimPath, prim_id: i32) -> Self {
        Self {
            id,
            prim_id,
            shared: Arc::new(RprimSharedData::new()),
            reprs: Vec::new(),
        }
    }

    pub fn id(&self) -> &PrimPath {
        &self.id
    }

    /// Index assigned by the render index, written to the `primId` buffer.
    pub fn prim_id(&self) -> i32 {
        self.prim_id
    }

    pub fn shared(&self) -> &Arc<RprimSharedData> {
        &self.shared
    }

    pub fn reprs(&self) -> &ReprList {
        &self.reprs
    }

    pub fn reprs_mut(&mut self) -> &mut ReprList {
        &mut self.reprs
    }

    pub fn repr(&self, name: &Token) -> Option<&Repr> {
        find_repr(&self.reprs, name)
    }

    pub fn repr_index(&self, name: &Token) -> Option<usize> {
        self.reprs.iter().position(|(n, _)| n == name)
    }

    // ------------------------------------------------------------------------
    // Shared sync steps
    // ------------------------------------------------------------------------

    pub fn update_visibility(&self, ctx: &SyncContext<'_>, bits: &DirtyBits) {
        if bits.contains(DirtyBits::DIRTY_VISIBILITY) {
            self.shared.set_visible(ctx.delegate.visible(&self.id));
        }
    }

    /// Transform, extent, prim id and constant-interpolation primvars.
    pub fn populate_constant_primvars(
        &self,
        ctx: &SyncContext<'_>,
        coord: &DrawingCoord,
        bits: &DirtyBits,
    ) {
        hydrant_core::profile_function!();
        let delegate = ctx.delegate;
        let mut sources: Vec<BufferSourceHandle> = Vec::new();

        if bits.contains(DirtyBits::DIRTY_TRANSFORM) {
            let transform = Value::Matrix4d(delegate.transform(&self.id));
            push_source(&mut sources, &self.id, tokens::TRANSFORM, transform, true);
        }
        if bits.contains(DirtyBits::DIRTY_EXTENT) {
            if let Some([min, max]) = delegate.extent(&self.id) {
                push_source(&mut sources, &self.id, tokens::EXTENT, Value::Vec3fArray(vec![min, max]), true);
            }
        }
        if bits.contains(DirtyBits::DIRTY_PRIM_ID) {
            push_source(&mut sources, &self.id, tokens::PRIM_ID, Value::Int(self.prim_id), true);
        }
        if bits.is_any_primvar_dirty() {
            for name in delegate.primvar_names(&self.id, Interpolation::Constant) {
                if !bits.is_primvar_dirty(&name) {
                    continue;
                }
                let value = delegate.get(&self.id, &name);
                push_source(&mut sources, &self.id, name, value, true);
            }
        }

        self.bind_and_enqueue(ctx, coord.constant_primvar, &tokens::CONSTANT_PRIMVAR, sources, None, || {
            Vec::new()
        });
    }

    /// Per-instance primvars of every instancer level above the rprim.
    pub fn populate_instance_primvars(
        &self,
        ctx: &SyncContext<'_>,
        coord: &DrawingCoord,
        bits: &DirtyBits,
    ) {
        if !bits.intersects(
            DirtyBits::DIRTY_INSTANCER | DirtyBits::DIRTY_INSTANCE_INDEX | DirtyBits::DIRTY_PRIMVAR,
        ) {
            return;
        }
        hydrant_core::profile_function!();
        let delegate = ctx.delegate;
        let levels = delegate.instancer_levels(&self.id);
        self.shared.set_instancer_levels(levels);

        for level in 0..levels {
            let collect = || {
                let mut sources = Vec::new();
                for name in delegate.instance_primvar_names(&self.id, level) {
                    let value = delegate.instance_primvar(&self.id, level, &name);
                    push_source(&mut sources, &self.id, name, value, false);
                }
                sources
            };
            let sources = collect();
            self.bind_and_enqueue(
                ctx,
                coord.instance_primvar_slot(level),
                &tokens::INSTANCE_PRIMVAR,
                sources,
                None,
                collect,
            );
        }
    }

    /// Bind a range for `sources` at `slot` and queue them.
    ///
    /// The bound range is reused while it is valid and its element count
    /// matches the count of the `count_key` source (or the first source).
    /// Otherwise a garbage collection is requested, the old range is
    /// invalidated and a fresh range is filled from `resized`, which must
    /// return the complete source set for the slot. The `count_key` source
    /// is queued first so sources of another length are the ones dropped.
    pub(crate) fn bind_and_enqueue(
        &self,
        ctx: &SyncContext<'_>,
        slot: usize,
        role: &Token,
        mut sources: Vec<BufferSourceHandle>,
        count_key: Option<&Token>,
        resized: impl FnOnce() -> Vec<BufferSourceHandle>,
    ) -> Option<Arc<BufferArrayRange>> {
        if sources.is_empty() {
            return None;
        }

        let expected = match count_key {
            Some(key) => sources.iter().find(|s| s.name() == key),
            None => sources.first(),
        }
        .map(|s| s.num_elements());

        let current = self.shared.range(slot).filter(|r| r.is_valid());
        let range = match current {
            Some(range)
                if expected.is_none()
                    || range.num_elements().is_none()
                    || range.num_elements() == expected =>
            {
                range
            }
            current => {
                if let Some(old) = current {
                    log::debug!(
                        "{}: {role} range {} resized from {:?} to {:?} elements",
                        self.id,
                        old.id(),
                        old.num_elements(),
                        expected
                    );
                    ctx.tracker.set_garbage_collection_needed();
                    old.invalidate();
                    sources = resized();
                }
                let mut specs = Vec::new();
                add_buffer_specs(&mut specs, &sources);
                let range = ctx
                    .registry
                    .allocate_non_uniform_buffer_array_range(role.clone(), specs);
                self.shared.set_range(slot, Arc::clone(&range));
                range
            }
        };

        // The first queued source fixes a fresh range's element count.
        if let Some(pos) = count_key.and_then(|key| sources.iter().position(|s| s.name() == key)) {
            sources[..=pos].rotate_right(1);
        }
        ctx.registry.add_sources(&range, sources);
        Some(range)
    }
}

/// Wrap `value` as a buffer source unless it is empty or has no layout.
pub(crate) fn push_source(
    sources: &mut Vec<BufferSourceHandle>,
    id: &PrimPath,
    name: Token,
    value: Value,
    constant: bool,
) {
    if value.len() == 0 {
        return;
    }
    let source = if constant {
        ValueBufferSource::constant(name, value)
    } else {
        ValueBufferSource::new(name, value)
    };
    match source {
        Ok(source) => sources.push(source.into_handle()),
        Err(err) => log::warn!("{id}: {err}"),
    }
}
