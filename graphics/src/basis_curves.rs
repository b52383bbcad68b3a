//! Basis curves rprim.
//!
//! Curves are drawn either as a polyline through their control points (the
//! hull) or as refined cubic patches. Both index buffers are built from the
//! same shared topology; each has a private dirty bit claimed from the custom
//! bit range so the two can be rebuilt independently.

use std::sync::Arc;

use hydrant_core::{BasisCurvesTopology, CurveType, PrimPath, Token, TopologyId, Value, tokens};

use crate::buffer::{BufferArrayRange, BufferSourceHandle, add_buffer_specs};
use crate::computations::{CurveIndexBuilder, CurveNormalsInterpolator, CurveWidthsInterpolator};
use crate::dirty::{ALL_SCENE_DIRTY_BITS, CLEAN, CustomBitAllocator, DirtyBits, split_bits};
use crate::draw_item::{CUSTOM_SLOTS_BEGIN, DrawItem, DrawingCoord, RprimSharedData};
use crate::error::{GraphicsError, Result};
use crate::repr::{BasisCurvesGeomStyle, BasisCurvesReprDesc, Repr, ReprConfigs};
use crate::rprim::{Rprim, RprimBase, SyncContext, push_source};
use crate::scene_delegate::Interpolation;
use crate::shader_key::GeometricShaderKey;

/// Key under which basis curves claim their custom dirty bits.
pub const CUSTOM_BITS_KEY: &str = "basisCurves";
/// Number of custom bits basis curves claim: refined indices and hull indices.
pub const CUSTOM_BIT_COUNT: u32 = 2;

/// Slot of the hull index range. Instance primvars start right after it.
pub const HULL_TOPOLOGY_SLOT: usize = CUSTOM_SLOTS_BEGIN;

const ALL_PRIMVAR_BITS: DirtyBits = DirtyBits::DIRTY_POINTS
    .union(DirtyBits::DIRTY_NORMALS)
    .union(DirtyBits::DIRTY_WIDTHS)
    .union(DirtyBits::DIRTY_PRIMVAR);

const REPR_DIRTY_BITS: DirtyBits = ALL_PRIMVAR_BITS
    .union(DirtyBits::DIRTY_REFINE_LEVEL)
    .union(DirtyBits::DIRTY_TOPOLOGY);

/// A batch of curves sharing type, basis and wrap.
#[derive(Debug)]
pub struct BasisCurves {
    base: RprimBase,
    dirty_indices: DirtyBits,
    dirty_hull_indices: DirtyBits,
    custom_dirty_bits_in_use: DirtyBits,
    topology: Option<Arc<BasisCurvesTopology>>,
    topology_id: TopologyId,
    refine_level: i32,
}

impl BasisCurves {
    /// Claim the custom bits every basis curves rprim of a render index uses.
    pub fn claim_custom_bits(allocator: &CustomBitAllocator) -> Result<DirtyBits> {
        allocator.register(CUSTOM_BITS_KEY, CUSTOM_BIT_COUNT)
    }

    /// Create a curves rprim using the bits returned by
    /// [`BasisCurves::claim_custom_bits`].
    pub fn new(id: PrimPath, prim_id: i32, custom_bits: DirtyBits) -> Self {
        let mut bits = split_bits(custom_bits);
        let dirty_indices = bits.next().unwrap_or(CLEAN);
        let dirty_hull_indices = bits.next().unwrap_or(CLEAN);
        Self {
            base: RprimBase::new(id, prim_id),
            dirty_indices,
            dirty_hull_indices,
            custom_dirty_bits_in_use: CLEAN,
            topology: None,
            topology_id: TopologyId::default(),
            refine_level: 0,
        }
    }

    pub fn topology(&self) -> Option<&Arc<BasisCurvesTopology>> {
        self.topology.as_ref()
    }

    /// Content id of the current topology, including the refinement flag.
    pub fn topology_id(&self) -> TopologyId {
        self.topology_id
    }

    pub fn refine_level(&self) -> i32 {
        self.refine_level
    }

    /// Private bit marking the refined index buffer dirty.
    pub fn dirty_indices_bit(&self) -> DirtyBits {
        self.dirty_indices
    }

    /// Private bit marking the hull index buffer dirty.
    pub fn dirty_hull_indices_bit(&self) -> DirtyBits {
        self.dirty_hull_indices
    }

    /// Private bits claimed by the reprs created so far.
    pub fn custom_dirty_bits_in_use(&self) -> DirtyBits {
        self.custom_dirty_bits_in_use
    }

    fn supports_smooth_curves(&self, desc: &BasisCurvesReprDesc, ctx: &SyncContext<'_>) -> bool {
        if desc.geom_style != BasisCurvesGeomStyle::Refined {
            return false;
        }
        let Some(topology) = &self.topology else {
            return false;
        };
        // Every supported basis can be refined.
        topology.curve_type == CurveType::Cubic
            && (self.refine_level > 0 || ctx.config.force_refined_curves)
    }

    // ------------------------------------------------------------------------
    // Repr management
    // ------------------------------------------------------------------------

    /// Find or create the repr `name` and update its draw items.
    ///
    /// Returns `false` when the repr has no draw items to update. The scene
    /// bits then describe work still owed to other reprs.
    fn get_repr(
        &mut self,
        ctx: &SyncContext<'_>,
        name: &Token,
        bits: &mut DirtyBits,
    ) -> Result<bool> {
        let descs: Vec<BasisCurvesReprDesc> = ctx
            .reprs
            .basis_curves
            .find(name)
            .iter()
            .copied()
            .filter(BasisCurvesReprDesc::is_valid)
            .collect();

        if descs.is_empty() {
            if self.base.repr_index(name).is_none() {
                self.base.reprs_mut().push((name.clone(), Repr::new()));
            }
            log::trace!("{}: no curve descs for {name}, nothing to sync", self.base.id());
            return Ok(false);
        }

        let (index, is_new) = match self.base.repr_index(name) {
            Some(index) => (index, false),
            None => {
                let repr = self.create_repr(&descs, bits);
                self.base.reprs_mut().push((name.clone(), repr));
                (self.base.reprs().len() - 1, true)
            }
        };

        *bits = self.propagate_dirty_bits(*bits);
        log::trace!("{}: syncing {name} with {}", self.base.id(), bits.describe());

        if bits.is_refine_level_dirty() {
            self.reset_geometric_shaders();
        }

        if is_new || bits.is_dirty() {
            for (item_index, desc) in descs.iter().enumerate() {
                self.update_draw_item(ctx, index, item_index, desc, bits)?;
            }
        }

        if bits.is_refine_level_dirty() {
            self.set_geometric_shaders(ctx);
        }
        Ok(true)
    }

    fn create_repr(&mut self, descs: &[BasisCurvesReprDesc], bits: &mut DirtyBits) -> Repr {
        let mut repr = Repr::new();
        for desc in descs {
            let mut item = DrawItem::new(Arc::clone(self.base.shared()));
            let coord = item.drawing_coord_mut();
            coord.instance_primvar = HULL_TOPOLOGY_SLOT + 1;

            let claimed = if desc.geom_style == BasisCurvesGeomStyle::Line {
                coord.topology = HULL_TOPOLOGY_SLOT;
                self.dirty_hull_indices
            } else {
                self.dirty_indices
            };
            if !self.custom_dirty_bits_in_use.contains(claimed) {
                self.custom_dirty_bits_in_use |= claimed;
                *bits |= claimed;
            }
            repr.add_draw_item(item);
        }
        repr
    }

    fn update_draw_item(
        &mut self,
        ctx: &SyncContext<'_>,
        repr_index: usize,
        item_index: usize,
        desc: &BasisCurvesReprDesc,
        bits: &mut DirtyBits,
    ) -> Result<()> {
        hydrant_core::profile_function!();
        let Some(coord) = self
            .draw_item(repr_index, item_index)
            .map(|item| *item.drawing_coord())
        else {
            return Ok(());
        };

        // Draw items share every range except their index range, so only the
        // first one populates them.
        let first = item_index == 0;
        if first {
            self.base.update_visibility(ctx, bits);
            self.base.populate_constant_primvars(ctx, &coord, bits);
            self.base.populate_instance_primvars(ctx, &coord, bits);
        }

        if bits.is_topology_dirty()
            || bits.is_refine_level_dirty()
            || bits.intersects(self.dirty_indices | self.dirty_hull_indices)
        {
            if first {
                self.sync_topology(ctx, bits);
            }
            self.populate_index_range(ctx, &coord, desc, bits);
        }

        if first && bits.is_any_primvar_dirty() {
            self.populate_vertex_primvars(ctx, &coord, bits);
            self.populate_element_primvars(ctx, &coord, bits);
        }

        if self.topology.is_none() {
            log::error!("{}: no topology to draw", self.base.id());
            bits.insert(DirtyBits::DIRTY_TOPOLOGY);
            return Err(GraphicsError::MissingTopology(self.base.id().clone()));
        }

        let needs_shader = self
            .draw_item(repr_index, item_index)
            .is_some_and(|item| item.geometric_shader().is_none());
        if needs_shader {
            self.set_geometric_shader(ctx, repr_index, item_index, desc);
        }
        Ok(())
    }

    fn draw_item(&self, repr_index: usize, item_index: usize) -> Option<&DrawItem> {
        self.base
            .reprs()
            .get(repr_index)
            .and_then(|(_, repr)| repr.draw_item(item_index))
    }

    // ------------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------------

    fn sync_topology(&mut self, ctx: &SyncContext<'_>, bits: &DirtyBits) {
        let id = self.base.id();
        if bits.is_refine_level_dirty() {
            self.refine_level = ctx.delegate.refine_level(id);
        }
        if !bits.is_topology_dirty() && !bits.is_refine_level_dirty() {
            return;
        }

        let topology = ctx.delegate.basis_curves_topology(id);
        let topology_id = topology
            .compute_hash()
            .combine_flag(self.refine_level > 0);
        let safe_mode = ctx.config.safe_mode;

        let shared = ctx
            .registry
            .register_basis_curves_topology(topology_id, |instance| match instance.value() {
                Some(existing) => {
                    if safe_mode && **existing != topology {
                        log::error!("{id}: basis curves topology id {topology_id:?} collides");
                        debug_assert!(false, "basis curves topology id collision");
                    }
                    Arc::clone(existing)
                }
                None => {
                    let topology = Arc::new(topology);
                    instance.set_value(Arc::clone(&topology));
                    topology
                }
            });

        log::trace!(
            "{id}: topology {topology_id:?} with {} curves, refine level {}",
            shared.num_curves(),
            self.refine_level
        );
        self.topology = Some(shared);
        self.topology_id = topology_id;
    }

    fn populate_index_range(
        &self,
        ctx: &SyncContext<'_>,
        coord: &DrawingCoord,
        desc: &BasisCurvesReprDesc,
        bits: &mut DirtyBits,
    ) {
        let Some(topology) = &self.topology else {
            return;
        };
        let id = self.base.id();
        let shared = self.base.shared();

        let (index_token, index_bit) = if coord.topology == HULL_TOPOLOGY_SLOT {
            (tokens::HULL_INDICES, self.dirty_hull_indices)
        } else {
            (tokens::INDICES, self.dirty_indices)
        };
        let dirty = if index_bit.is_empty() {
            bits.is_topology_dirty() || bits.is_refine_level_dirty()
        } else {
            bits.intersects(index_bit)
        };
        if !dirty {
            return;
        }
        bits.remove(index_bit);

        if topology.is_empty() {
            if shared.clear_range(coord.topology).is_some() {
                ctx.tracker.set_garbage_collection_needed();
            }
            log::trace!("{id}: empty topology, no {index_token}");
            return;
        }

        let refine =
            index_token == tokens::INDICES && self.supports_smooth_curves(desc, ctx);
        let range = ctx.registry.register_basis_curves_index_range(
            self.topology_id,
            &index_token,
            |instance| {
                if let Some(range) = instance.value() {
                    return Arc::clone(range);
                }
                let builder = CurveIndexBuilder::new(Arc::clone(topology), refine);
                log::trace!(
                    "{id}: building {index_token} ({})",
                    if builder.builds_patches() { "patches" } else { "lines" }
                );
                let source: BufferSourceHandle = Arc::new(builder);
                let mut specs = Vec::new();
                add_buffer_specs(&mut specs, std::slice::from_ref(&source));
                let range = ctx
                    .registry
                    .allocate_non_uniform_buffer_array_range(tokens::TOPOLOGY, specs);
                ctx.registry.add_source(&range, source);
                instance.set_value(Arc::clone(&range));
                range
            },
        );

        if let Some(previous) = shared.set_range(coord.topology, Arc::clone(&range)) {
            if previous.id() != range.id() {
                ctx.tracker.set_garbage_collection_needed();
            }
        }
    }

    // ------------------------------------------------------------------------
    // Primvars
    // ------------------------------------------------------------------------

    fn collect_vertex_sources(&self, ctx: &SyncContext<'_>, bits: DirtyBits) -> Vec<BufferSourceHandle> {
        let delegate = ctx.delegate;
        let id = self.base.id();
        let topology = self.topology.as_deref();

        let mut names = delegate.primvar_names(id, Interpolation::Vertex);
        names.extend(delegate.primvar_names(id, Interpolation::Varying));

        let mut sources: Vec<BufferSourceHandle> = Vec::new();
        for name in names {
            if !bits.is_primvar_dirty(&name) {
                continue;
            }
            let value = delegate.get(id, &name);
            if value.len() == 0 {
                continue;
            }

            if name == tokens::POINTS {
                match topology {
                    None => log::error!("{id}: points authored without a topology"),
                    Some(topology) => match value.as_vec3f_array() {
                        None => log::warn!("{id}: points hold {}", value.type_name()),
                        Some(points) => {
                            let needed = topology.calculate_needed_number_of_control_points();
                            if !topology.has_indices() && points.len() != needed {
                                log::warn!(
                                    "{id}: topology needs {needed} points, {} authored",
                                    points.len()
                                );
                            }
                        }
                    },
                }
            }

            match topology {
                Some(topology) if name == tokens::WIDTHS => {
                    let widths = match value {
                        Value::FloatArray(widths) => widths,
                        Value::Float(width) => vec![width],
                        other => {
                            log::warn!("{id}: widths hold {}", other.type_name());
                            continue;
                        }
                    };
                    sources.push(Arc::new(CurveWidthsInterpolator::new(topology, widths)));
                }
                Some(topology) if name == tokens::NORMALS => {
                    let normals = match value {
                        Value::Vec3fArray(normals) => normals,
                        other => {
                            log::warn!("{id}: normals hold {}", other.type_name());
                            continue;
                        }
                    };
                    sources.push(Arc::new(CurveNormalsInterpolator::new(topology, normals)));
                }
                _ => push_source(&mut sources, id, name, value, false),
            }
        }

        sources.retain(|source| source.num_elements() > 0);
        sources
    }

    fn populate_vertex_primvars(
        &self,
        ctx: &SyncContext<'_>,
        coord: &DrawingCoord,
        bits: &DirtyBits,
    ) {
        let sources = self.collect_vertex_sources(ctx, *bits);
        self.base.bind_and_enqueue(
            ctx,
            coord.vertex_primvar,
            &tokens::PRIMVAR,
            sources,
            Some(&tokens::POINTS),
            || self.collect_vertex_sources(ctx, ALL_PRIMVAR_BITS),
        );
    }

    fn collect_element_sources(&self, ctx: &SyncContext<'_>, bits: DirtyBits) -> Vec<BufferSourceHandle> {
        let id = self.base.id();
        let mut sources = Vec::new();
        for name in ctx.delegate.primvar_names(id, Interpolation::Uniform) {
            if !bits.is_primvar_dirty(&name) {
                continue;
            }
            let value = ctx.delegate.get(id, &name);
            push_source(&mut sources, id, name, value, false);
        }
        sources
    }

    fn populate_element_primvars(
        &self,
        ctx: &SyncContext<'_>,
        coord: &DrawingCoord,
        bits: &DirtyBits,
    ) {
        let sources = self.collect_element_sources(ctx, *bits);
        self.base.bind_and_enqueue(
            ctx,
            coord.element_primvar,
            &tokens::PRIMVAR,
            sources,
            None,
            || self.collect_element_sources(ctx, ALL_PRIMVAR_BITS),
        );
    }

    // ------------------------------------------------------------------------
    // Geometric shaders
    // ------------------------------------------------------------------------

    fn geometric_shader_key(
        &self,
        ctx: &SyncContext<'_>,
        item: &DrawItem,
        desc: &BasisCurvesReprDesc,
    ) -> Option<GeometricShaderKey> {
        let topology = self.topology.as_ref()?;
        let has_normals = |range: Option<Arc<BufferArrayRange>>| {
            range.is_some_and(|r| r.has_resource(&tokens::NORMALS))
        };
        let authored_normals = has_normals(item.constant_primvar_range())
            || has_normals(item.vertex_primvar_range())
            || has_normals(item.element_primvar_range())
            || (0..item.instance_primvar_num_levels())
                .any(|level| has_normals(item.instance_primvar_range(level)));

        Some(GeometricShaderKey::BasisCurves {
            basis: topology.curve_basis,
            authored_normals,
            smooth: self.supports_smooth_curves(desc, ctx),
        })
    }

    fn set_geometric_shader(
        &mut self,
        ctx: &SyncContext<'_>,
        repr_index: usize,
        item_index: usize,
        desc: &BasisCurvesReprDesc,
    ) {
        let Some(key) = self
            .draw_item(repr_index, item_index)
            .and_then(|item| self.geometric_shader_key(ctx, item, desc))
        else {
            return;
        };
        let shader = ctx.registry.register_geometric_shader(key);
        if let Some(item) = self
            .base
            .reprs_mut()
            .get_mut(repr_index)
            .and_then(|(_, repr)| repr.draw_item_mut(item_index))
        {
            item.set_geometric_shader(Some(shader));
        }
    }

    fn reset_geometric_shaders(&mut self) {
        for (_, repr) in self.base.reprs_mut() {
            for item in repr.draw_items_mut() {
                item.set_geometric_shader(None);
            }
        }
    }

    fn set_geometric_shaders(&mut self, ctx: &SyncContext<'_>) {
        let reprs: Vec<(usize, Vec<BasisCurvesReprDesc>)> = self
            .base
            .reprs()
            .iter()
            .enumerate()
            .map(|(index, (name, _))| {
                let descs = ctx
                    .reprs
                    .basis_curves
                    .find(name)
                    .iter()
                    .copied()
                    .filter(BasisCurvesReprDesc::is_valid)
                    .collect();
                (index, descs)
            })
            .collect();

        for (repr_index, descs) in reprs {
            for (item_index, desc) in descs.iter().enumerate() {
                self.set_geometric_shader(ctx, repr_index, item_index, desc);
            }
        }
    }
}

impl Rprim for BasisCurves {
    fn id(&self) -> &PrimPath {
        self.base.id()
    }

    fn initial_dirty_bits(&self) -> DirtyBits {
        REPR_DIRTY_BITS
            | DirtyBits::DIRTY_PRIM_ID
            | DirtyBits::DIRTY_EXTENT
            | DirtyBits::DIRTY_SURFACE_SHADER
            | DirtyBits::DIRTY_TRANSFORM
            | DirtyBits::DIRTY_VISIBILITY
            | DirtyBits::DIRTY_INSTANCE_INDEX
            | DirtyBits::DIRTY_REPR
    }

    fn propagate_dirty_bits(&self, bits: DirtyBits) -> DirtyBits {
        if bits.is_topology_dirty() {
            bits | (self.custom_dirty_bits_in_use & (self.dirty_indices | self.dirty_hull_indices))
        } else {
            bits
        }
    }

    fn dirty_bits_mask(&self, reprs: &ReprConfigs, repr: &Token) -> DirtyBits {
        if reprs.basis_curves.find(repr).iter().any(BasisCurvesReprDesc::is_valid) {
            REPR_DIRTY_BITS
        } else {
            CLEAN
        }
    }

    fn sync(&mut self, ctx: &SyncContext<'_>, repr: &Token, bits: &mut DirtyBits) -> Result<()> {
        hydrant_core::profile_function!();
        if self.get_repr(ctx, repr, bits)? {
            bits.remove(ALL_SCENE_DIRTY_BITS);
        }
        Ok(())
    }

    fn repr(&self, name: &Token) -> Option<&Repr> {
        self.base.repr(name)
    }

    fn shared_data(&self) -> &Arc<RprimSharedData> {
        self.base.shared()
    }
}
