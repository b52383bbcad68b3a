//! Draw items and the rprim state they share.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::buffer::{BufferArrayRange, BufferArrayRangeContainer};
use crate::shader_key::GeometricShader;

/// Slot of the topology (index) range.
pub const TOPOLOGY_SLOT: usize = 0;
/// Slot of the constant primvar range.
pub const CONSTANT_PRIMVAR_SLOT: usize = 1;
/// Slot of the vertex primvar range.
pub const VERTEX_PRIMVAR_SLOT: usize = 2;
/// Slot of the element (uniform) primvar range.
pub const ELEMENT_PRIMVAR_SLOT: usize = 3;
/// First slot rprim types may use for their own ranges.
pub const CUSTOM_SLOTS_BEGIN: usize = 4;

/// Slot indices a draw item reads its ranges from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawingCoord {
    pub topology: usize,
    pub constant_primvar: usize,
    pub vertex_primvar: usize,
    pub element_primvar: usize,
    /// Slot of instance level 0; level `n` lives at `instance_primvar + n`.
    pub instance_primvar: usize,
}

impl Default for DrawingCoord {
    fn default() -> Self {
        Self {
            topology: TOPOLOGY_SLOT,
            constant_primvar: CONSTANT_PRIMVAR_SLOT,
            vertex_primvar: VERTEX_PRIMVAR_SLOT,
            element_primvar: ELEMENT_PRIMVAR_SLOT,
            instance_primvar: CUSTOM_SLOTS_BEGIN,
        }
    }
}

impl DrawingCoord {
    /// Slot of instance primvar level `level`.
    pub fn instance_primvar_slot(&self, level: usize) -> usize {
        self.instance_primvar + level
    }
}

/// State shared by every draw item of one rprim.
#[derive(Debug)]
pub struct RprimSharedData {
    container: RwLock<BufferArrayRangeContainer>,
    visible: AtomicBool,
    instancer_levels: AtomicUsize,
}

static_assertions::assert_impl_all!(RprimSharedData: Send, Sync);

impl Default for RprimSharedData {
    fn default() -> Self {
        Self {
            container: RwLock::default(),
            visible: AtomicBool::new(true),
            instancer_levels: AtomicUsize::new(0),
        }
    }
}

impl RprimSharedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self, slot: usize) -> Option<Arc<BufferArrayRange>> {
        self.container.read().get(slot).cloned()
    }

    /// Bind `range` to `slot`, returning the previously bound range.
    pub fn set_range(
        &self,
        slot: usize,
        range: Arc<BufferArrayRange>,
    ) -> Option<Arc<BufferArrayRange>> {
        let mut container = self.container.write();
        let previous = container.take(slot);
        container.set(slot, range);
        previous
    }

    /// Unbind `slot`.
    pub fn clear_range(&self, slot: usize) -> Option<Arc<BufferArrayRange>> {
        self.container.write().take(slot)
    }

    /// Snapshot of the slot table.
    pub fn container(&self) -> BufferArrayRangeContainer {
        self.container.read().clone()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }

    pub fn instancer_levels(&self) -> usize {
        self.instancer_levels.load(Ordering::Acquire)
    }

    pub fn set_instancer_levels(&self, levels: usize) {
        self.instancer_levels.store(levels, Ordering::Release);
    }
}

/// One drawable batch of an rprim repr.
///
/// A draw item owns no buffers itself; it resolves them through its
/// [`DrawingCoord`] in the rprim's shared slot table.
#[derive(Debug)]
pub struct DrawItem {
    shared: Arc<RprimSharedData>,
    coord: DrawingCoord,
    geometric_shader: Option<Arc<GeometricShader>>,
}

impl DrawItem {
    pub fn new(shared: Arc<RprimSharedData>) -> Self {
        Self {
            shared,
            coord: DrawingCoord::default(),
            geometric_shader: None,
        }
    }

    pub fn drawing_coord(&self) -> &DrawingCoord {
        &self.coord
    }

    pub fn drawing_coord_mut(&mut self) -> &mut DrawingCoord {
        &mut self.coord
    }

    pub fn shared_data(&self) -> &Arc<RprimSharedData> {
        &self.shared
    }

    pub fn topology_range(&self) -> Option<Arc<BufferArrayRange>> {
        self.shared.range(self.coord.topology)
    }

    pub fn constant_primvar_range(&self) -> Option<Arc<BufferArrayRange>> {
        self.shared.range(self.coord.constant_primvar)
    }

    pub fn vertex_primvar_range(&self) -> Option<Arc<BufferArrayRange>> {
        self.shared.range(self.coord.vertex_primvar)
    }

    pub fn element_primvar_range(&self) -> Option<Arc<BufferArrayRange>> {
        self.shared.range(self.coord.element_primvar)
    }

    pub fn instance_primvar_range(&self, level: usize) -> Option<Arc<BufferArrayRange>> {
        self.shared.range(self.coord.instance_primvar_slot(level))
    }

    pub fn instance_primvar_num_levels(&self) -> usize {
        self.shared.instancer_levels()
    }

    pub fn geometric_shader(&self) -> Option<&Arc<GeometricShader>> {
        self.geometric_shader.as_ref()
    }

    pub fn set_geometric_shader(&mut self, shader: Option<Arc<GeometricShader>>) {
        self.geometric_shader = shader;
    }

    /// Whether the rprim should be drawn at all.
    pub fn is_visible(&self) -> bool {
        self.shared.is_visible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrant_core::tokens;

    #[test]
    fn draw_items_share_slots() {
        let shared = Arc::new(RprimSharedData::new());
        let mut hull = DrawItem::new(Arc::clone(&shared));
        hull.drawing_coord_mut().topology = CUSTOM_SLOTS_BEGIN;
        let refined = DrawItem::new(Arc::clone(&shared));

        let vertex = Arc::new(BufferArrayRange::new(1, tokens::PRIMVAR, Vec::new()));
        assert!(shared.set_range(VERTEX_PRIMVAR_SLOT, Arc::clone(&vertex)).is_none());

        assert_eq!(hull.vertex_primvar_range().map(|r| r.id()), Some(1));
        assert_eq!(refined.vertex_primvar_range().map(|r| r.id()), Some(1));
        assert!(hull.topology_range().is_none());
        assert!(refined.topology_range().is_none());
    }

    #[test]
    fn instance_levels() {
        let shared = Arc::new(RprimSharedData::new());
        let item = DrawItem::new(Arc::clone(&shared));
        assert!(item.is_visible());
        shared.set_instancer_levels(2);
        assert_eq!(item.instance_primvar_num_levels(), 2);
        assert_eq!(item.drawing_coord().instance_primvar_slot(1), CUSTOM_SLOTS_BEGIN + 1);
        assert!(item.instance_primvar_range(0).is_none());
    }
}
