//! Buffer array ranges and the per-rprim slot container.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hydrant_core::{Token, TupleType};
use parking_lot::RwLock;

use super::spec::BufferSpec;
use crate::error::{GraphicsError, Result};

/// Staged contents of one named buffer in a range.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferResource {
    /// Buffer name.
    pub name: Token,
    /// Element layout.
    pub tuple_type: TupleType,
    /// Bytes written by the last commit. Empty until then.
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct RangeState {
    num_elements: Option<usize>,
    resources: Vec<BufferResource>,
}

/// An allocation holding one resource per buffer spec.
///
/// Ranges are created by
/// [`ResourceRegistry::allocate_non_uniform_buffer_array_range`](crate::resource_registry::ResourceRegistry::allocate_non_uniform_buffer_array_range)
/// and shared through `Arc`. The first enqueued source fixes the element
/// count; a range is never resized afterwards.
pub struct BufferArrayRange {
    id: u64,
    role: Token,
    specs: Vec<BufferSpec>,
    state: RwLock<RangeState>,
    valid: AtomicBool,
}

static_assertions::assert_impl_all!(BufferArrayRange: Send, Sync);

impl BufferArrayRange {
    pub(crate) fn new(id: u64, role: Token, specs: Vec<BufferSpec>) -> Self {
        let resources = specs
            .iter()
            .map(|spec| BufferResource {
                name: spec.name.clone(),
                tuple_type: spec.tuple_type,
                data: Vec::new(),
            })
            .collect();
        Self {
            id,
            role,
            specs,
            state: RwLock::new(RangeState {
                num_elements: None,
                resources,
            }),
            valid: AtomicBool::new(true),
        }
    }

    /// Unique id of this allocation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Role the range was allocated for, e.g. `topology` or `primvar`.
    pub fn role(&self) -> &Token {
        &self.role
    }

    /// Specs the range was allocated with.
    pub fn specs(&self) -> &[BufferSpec] {
        &self.specs
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Mark the range as abandoned.
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    /// Element count, once fixed by the first enqueue.
    pub fn num_elements(&self) -> Option<usize> {
        self.state.read().num_elements
    }

    /// Whether a buffer named `name` exists in this range.
    pub fn has_resource(&self, name: &Token) -> bool {
        self.state.read().resources.iter().any(|r| r.name == *name)
    }

    /// Snapshot of the named resource.
    pub fn resource(&self, name: &Token) -> Option<BufferResource> {
        self.state
            .read()
            .resources
            .iter()
            .find(|r| r.name == *name)
            .cloned()
    }

    /// Names of every resource.
    pub fn resource_names(&self) -> Vec<Token> {
        self.state.read().resources.iter().map(|r| r.name.clone()).collect()
    }

    /// Fix the element count, or check it against the fixed one.
    pub(crate) fn reserve_elements(&self, name: &Token, count: usize) -> Result<()> {
        let mut state = self.state.write();
        match state.num_elements {
            None => {
                state.num_elements = Some(count);
                Ok(())
            }
            Some(expected) if expected == count => Ok(()),
            Some(expected) => Err(GraphicsError::SourceSizeMismatch {
                name: name.clone(),
                expected,
                actual: count,
            }),
        }
    }

    /// Add resources for specs not yet present.
    pub(crate) fn ensure_resources(&self, specs: &[BufferSpec]) {
        let mut state = self.state.write();
        for spec in specs {
            if !state.resources.iter().any(|r| r.name == spec.name) {
                state.resources.push(BufferResource {
                    name: spec.name.clone(),
                    tuple_type: spec.tuple_type,
                    data: Vec::new(),
                });
            }
        }
    }

    /// Store resolved bytes in the named resource.
    pub(crate) fn stage(&self, name: &Token, data: Vec<u8>) {
        let mut state = self.state.write();
        if let Some(resource) = state.resources.iter_mut().find(|r| r.name == *name) {
            resource.data = data;
        }
    }
}

impl std::fmt::Debug for BufferArrayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferArrayRange")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("num_elements", &self.num_elements())
            .field("valid", &self.is_valid())
            .finish()
    }
}

// ============================================================================
// Slot container
// ============================================================================

/// Slot table of ranges shared by all draw items of one rprim.
///
/// Draw items address it through the slot indices of their
/// [`DrawingCoord`](crate::draw_item::DrawingCoord).
#[derive(Debug, Default, Clone)]
pub struct BufferArrayRangeContainer {
    ranges: Vec<Option<Arc<BufferArrayRange>>>,
}

impl BufferArrayRangeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `range` to `index`, growing the table as needed.
    pub fn set(&mut self, index: usize, range: Arc<BufferArrayRange>) {
        if index >= self.ranges.len() {
            self.ranges.resize(index + 1, None);
        }
        self.ranges[index] = Some(range);
    }

    pub fn get(&self, index: usize) -> Option<&Arc<BufferArrayRange>> {
        self.ranges.get(index).and_then(Option::as_ref)
    }

    /// Unbind `index`, returning the previous range.
    pub fn take(&mut self, index: usize) -> Option<Arc<BufferArrayRange>> {
        self.ranges.get_mut(index).and_then(Option::take)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydrant_core::{ComponentType, tokens};

    fn points_range(id: u64) -> BufferArrayRange {
        BufferArrayRange::new(
            id,
            tokens::PRIMVAR,
            vec![BufferSpec::new(
                tokens::POINTS,
                TupleType::new(ComponentType::Float32, 3),
            )],
        )
    }

    #[test]
    fn first_reservation_fixes_count() {
        let range = points_range(1);
        assert_eq!(range.num_elements(), None);
        range.reserve_elements(&tokens::POINTS, 4).unwrap();
        range.reserve_elements(&tokens::WIDTHS, 4).unwrap();
        let err = range.reserve_elements(&tokens::NORMALS, 3).unwrap_err();
        assert!(matches!(err, GraphicsError::SourceSizeMismatch { expected: 4, actual: 3, .. }));
        assert_eq!(range.num_elements(), Some(4));
    }

    #[test]
    fn resources_follow_specs() {
        let range = points_range(2);
        assert!(range.has_resource(&tokens::POINTS));
        assert!(!range.has_resource(&tokens::NORMALS));
        range.ensure_resources(&[BufferSpec::new(
            tokens::NORMALS,
            TupleType::new(ComponentType::Float32, 3),
        )]);
        assert!(range.has_resource(&tokens::NORMALS));

        range.stage(&tokens::POINTS, vec![0; 12]);
        assert_eq!(range.resource(&tokens::POINTS).unwrap().data.len(), 12);
    }

    #[test]
    fn invalidate() {
        let range = points_range(3);
        assert!(range.is_valid());
        range.invalidate();
        assert!(!range.is_valid());
        assert!(format!("{range:?}").contains("valid: false"));
    }

    #[test]
    fn container_slots() {
        let mut container = BufferArrayRangeContainer::new();
        assert!(container.is_empty());
        container.set(3, Arc::new(points_range(4)));
        assert_eq!(container.len(), 4);
        assert!(container.get(0).is_none());
        assert_eq!(container.get(3).map(|r| r.id()), Some(4));
        assert!(container.take(3).is_some());
        assert!(container.is_empty());
    }
}
