//! Image plane rprim: a textured quad positioned in the scene.

use std::sync::Arc;

use hydrant_core::{MeshTopology, PrimPath, Token, TopologyId, tokens};

use crate::buffer::{BufferSourceHandle, add_buffer_specs};
use crate::computations::TriangleIndexBuilder;
use crate::dirty::{ALL_SCENE_DIRTY_BITS, DirtyBits};
use crate::draw_item::{DrawItem, DrawingCoord, RprimSharedData};
use crate::error::{GraphicsError, Result};
use crate::repr::{ImagePlaneReprDesc, Repr, ReprConfigs};
use crate::rprim::{Rprim, RprimBase, SyncContext, push_source};
use crate::scene_delegate::Interpolation;
use crate::shader_key::GeometricShaderKey;

const ALL_PRIMVAR_BITS: DirtyBits = DirtyBits::DIRTY_POINTS
    .union(DirtyBits::DIRTY_NORMALS)
    .union(DirtyBits::DIRTY_WIDTHS)
    .union(DirtyBits::DIRTY_PRIMVAR);

#[derive(Debug)]
pub struct ImagePlane {
    base: RprimBase,
    topology: Option<Arc<MeshTopology>>,
    topology_id: TopologyId,
}

impl ImagePlane {
    pub fn new(id: PrimPath, prim_id: i32) -> Self {
        Self {
            base: RprimBase::new(id, prim_id),
            topology: None,
            topology_id: TopologyId::default(),
        }
    }

    pub fn topology(&self) -> Option<&Arc<MeshTopology>> {
        self.topology.as_ref()
    }

    pub fn topology_id(&self) -> TopologyId {
        self.topology_id
    }

    /// Update the plane's draw item.
    ///
    /// Returns `false` when the plane has nothing drawable for `repr`, leaving
    /// the scene bits for a later pass.
    fn update_repr(&mut self, ctx: &SyncContext<'_>, repr: &Token, bits: &mut DirtyBits) -> Result<bool> {
        // Image planes carry a single repr whatever name it was created under.
        let Some((_, first)) = self.base.reprs().first() else {
            if !has_valid_desc(ctx.reprs, repr) {
                log::trace!("{}: no image plane descs for {repr}, nothing to sync", self.base.id());
                return Ok(false);
            }
            log::error!("{}: init_repr was not called for {repr}", self.base.id());
            return Err(GraphicsError::ReprNotInitialized {
                path: self.base.id().clone(),
                repr: repr.clone(),
            });
        };
        let Some(coord) = first.draw_item(0).map(|item| *item.drawing_coord()) else {
            return Ok(false);
        };

        if bits.is_dirty() {
            self.update_draw_item(ctx, &coord, bits);
            bits.remove(DirtyBits::NEW_REPR);
        }
        Ok(true)
    }

    fn update_draw_item(&mut self, ctx: &SyncContext<'_>, coord: &DrawingCoord, bits: &mut DirtyBits) {
        hydrant_core::profile_function!();
        self.base.update_visibility(ctx, bits);
        self.base.populate_constant_primvars(ctx, coord, bits);

        let shader = ctx
            .registry
            .register_geometric_shader(GeometricShaderKey::ImagePlane);
        if let Some(item) = self.draw_item_mut() {
            item.set_geometric_shader(Some(shader));
        }
        ctx.tracker.mark_shader_bindings_dirty();

        if bits.is_any_primvar_dirty() {
            self.populate_vertex_primvars(ctx, coord, bits);
        }
        if bits.is_topology_dirty() {
            self.populate_topology(ctx, coord);
        }
    }

    fn draw_item_mut(&mut self) -> Option<&mut DrawItem> {
        self.base
            .reprs_mut()
            .first_mut()
            .and_then(|(_, repr)| repr.draw_item_mut(0))
    }

    fn collect_vertex_sources(&self, ctx: &SyncContext<'_>, bits: DirtyBits) -> Vec<BufferSourceHandle> {
        let id = self.base.id();
        let mut names = ctx.delegate.primvar_names(id, Interpolation::Vertex);
        names.extend(ctx.delegate.primvar_names(id, Interpolation::Varying));

        let mut sources = Vec::new();
        for name in names {
            if !bits.is_primvar_dirty(&name) {
                continue;
            }
            let value = ctx.delegate.get(id, &name);
            push_source(&mut sources, id, name, value, false);
        }
        sources
    }

    fn populate_vertex_primvars(&self, ctx: &SyncContext<'_>, coord: &DrawingCoord, bits: &DirtyBits) {
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

    fn populate_topology(&mut self, ctx: &SyncContext<'_>, coord: &DrawingCoord) {
        let id = self.base.id();
        let topology = ctx.delegate.mesh_topology(id);
        let topology_id = topology.compute_hash();
        let safe_mode = ctx.config.safe_mode;

        let topology = ctx
            .registry
            .register_mesh_topology(topology_id, |instance| match instance.value() {
                Some(existing) => {
                    if safe_mode && **existing != topology {
                        log::error!("{id}: mesh topology id {topology_id:?} collides");
                        debug_assert!(false, "mesh topology id collision");
                    }
                    Arc::clone(existing)
                }
                None => {
                    let topology = Arc::new(topology);
                    instance.set_value(Arc::clone(&topology));
                    topology
                }
            });

        let shared = self.base.shared();
        if topology.is_empty() {
            if shared.clear_range(coord.topology).is_some() {
                ctx.tracker.set_garbage_collection_needed();
            }
        } else {
            let range = ctx.registry.register_mesh_index_range(
                topology_id,
                &tokens::INDICES,
                |instance| {
                    if let Some(range) = instance.value() {
                        return Arc::clone(range);
                    }
                    let source: BufferSourceHandle =
                        Arc::new(TriangleIndexBuilder::new(&topology, id));
                    let mut specs = Vec::new();
                    add_buffer_specs(&mut specs, std::slice::from_ref(&source));
                    let range = ctx
                        .registry
                        .allocate_non_uniform_buffer_array_range(tokens::TOPOLOGY, specs);
                    ctx.registry.add_source(&range, source);
                    instance.set_value(Arc::clone(&range));
                    if shared.range(coord.topology).is_some() {
                        ctx.tracker.set_garbage_collection_needed();
                    }
                    range
                },
            );
            shared.set_range(coord.topology, range);
        }

        self.topology = Some(topology);
        self.topology_id = topology_id;
    }
}

impl Rprim for ImagePlane {
    fn id(&self) -> &PrimPath {
        self.base.id()
    }

    fn initial_dirty_bits(&self) -> DirtyBits {
        DirtyBits::INIT_REPR
            | DirtyBits::DIRTY_POINTS
            | DirtyBits::DIRTY_TOPOLOGY
            | DirtyBits::DIRTY_TRANSFORM
            | DirtyBits::DIRTY_PRIM_ID
            | DirtyBits::DIRTY_REPR
            | DirtyBits::DIRTY_PRIMVAR
            | DirtyBits::DIRTY_MATERIAL_ID
            | DirtyBits::DIRTY_VISIBILITY
    }

    fn propagate_dirty_bits(&self, bits: DirtyBits) -> DirtyBits {
        bits
    }

    fn init_repr(&mut self, reprs: &ReprConfigs, repr: &Token, bits: &mut DirtyBits) {
        bits.remove(DirtyBits::INIT_REPR);
        if !self.base.reprs().is_empty() {
            return;
        }

        let descs = reprs.image_plane.find(repr).iter().filter(|d| d.is_valid()).count();
        if descs == 0 {
            return;
        }
        let mut created = Repr::new();
        for _ in 0..descs {
            created.add_draw_item(DrawItem::new(Arc::clone(self.base.shared())));
        }
        self.base.reprs_mut().push((repr.clone(), created));
        *bits |= DirtyBits::NEW_REPR;
    }

    fn dirty_bits_mask(&self, reprs: &ReprConfigs, repr: &Token) -> DirtyBits {
        if has_valid_desc(reprs, repr) {
            self.initial_dirty_bits().difference(DirtyBits::INIT_REPR)
        } else {
            DirtyBits::empty()
        }
    }

    fn sync(&mut self, ctx: &SyncContext<'_>, repr: &Token, bits: &mut DirtyBits) -> Result<()> {
        hydrant_core::profile_function!();
        if self.update_repr(ctx, repr, bits)? {
            bits.remove(ALL_SCENE_DIRTY_BITS);
        }
        Ok(())
    }

    fn repr(&self, name: &Token) -> Option<&Repr> {
        self.base
            .repr(name)
            .or_else(|| self.base.reprs().first().map(|(_, repr)| repr))
    }

    fn shared_data(&self) -> &Arc<RprimSharedData> {
        self.base.shared()
    }
}

fn has_valid_desc(reprs: &ReprConfigs, repr: &Token) -> bool {
    reprs.image_plane.find(repr).iter().any(ImagePlaneReprDesc::is_valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_repr_creates_one_repr() {
        let reprs = ReprConfigs::with_defaults(false);
        let mut plane = ImagePlane::new(PrimPath::new("/plane"), 0);

        let mut bits = plane.initial_dirty_bits();
        plane.init_repr(&reprs, &tokens::HULL, &mut bits);
        assert!(bits.contains(DirtyBits::NEW_REPR));
        assert!(!bits.contains(DirtyBits::INIT_REPR));
        assert_eq!(plane.repr(&tokens::HULL).map(|r| r.draw_items().len()), Some(1));

        let mut bits = DirtyBits::INIT_REPR;
        plane.init_repr(&reprs, &tokens::REFINED, &mut bits);
        assert!(bits.is_empty());
        assert_eq!(plane.base.reprs().len(), 1);
        let hull = plane.repr(&tokens::HULL).expect("hull repr");
        let refined = plane.repr(&tokens::REFINED).expect("falls back to the only repr");
        assert!(std::ptr::eq(hull, refined));
    }

    #[test]
    fn init_repr_skips_names_without_descs() {
        let reprs = ReprConfigs::with_defaults(false);
        let mut plane = ImagePlane::new(PrimPath::new("/plane"), 0);

        let mut bits = plane.initial_dirty_bits();
        plane.init_repr(&reprs, &Token::new("selection"), &mut bits);
        assert!(!bits.contains(DirtyBits::NEW_REPR));
        assert!(plane.base.reprs().is_empty());
        assert!(plane.repr(&Token::new("selection")).is_none());
        assert!(plane.dirty_bits_mask(&reprs, &Token::new("selection")).is_empty());
    }

    #[test]
    fn propagation_is_identity() {
        let plane = ImagePlane::new(PrimPath::new("/plane"), 0);
        for bits in [DirtyBits::DIRTY_TOPOLOGY, DirtyBits::DIRTY_POINTS | DirtyBits::DIRTY_WIDTHS] {
            assert_eq!(plane.propagate_dirty_bits(bits), bits);
        }
    }
}
