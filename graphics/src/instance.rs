//! Hash-keyed instance tables for shared resources.
//!
//! An [`InstanceRegistry`] maps a 64-bit content id to one shared value. The
//! first caller to register an id constructs and publishes the value while
//! holding that id's lock; concurrent callers with the same id block on that
//! lock alone and then observe the published value.
//!
//! ```
//! use std::sync::Arc;
//! use hydrant_graphics::instance::InstanceRegistry;
//!
//! let registry = InstanceRegistry::<Arc<String>>::new();
//! let value = registry.register(7, |instance| {
//!     if instance.is_first_instance() {
//!         instance.set_value(Arc::new("shared".to_string()));
//!     }
//!     instance.value().cloned()
//! });
//! assert_eq!(value.as_deref().map(String::as_str), Some("shared"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

const SHARD_COUNT: usize = 16;

type Slot<V> = Arc<Mutex<Option<V>>>;

/// Sharded table of per-key locked values.
pub struct InstanceRegistry<V> {
    shards: [Mutex<HashMap<u64, Slot<V>>>; SHARD_COUNT],
}

static_assertions::assert_impl_all!(InstanceRegistry<Arc<u32>>: Send, Sync);

impl<V> Default for InstanceRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> InstanceRegistry<V> {
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| Mutex::new(HashMap::new())),
        }
    }

    fn shard(&self, key: u64) -> &Mutex<HashMap<u64, Slot<V>>> {
        &self.shards[(key as usize) % SHARD_COUNT]
    }

    /// Lock the entry for `key` and run `f` with it.
    ///
    /// The shard lock is only held to find or create the entry. A newly
    /// created entry is locked before the shard lock is released, so its
    /// creator always sees itself as the first instance.
    pub fn register<R>(&self, key: u64, f: impl FnOnce(&mut InstanceGuard<'_, V>) -> R) -> R {
        let mut shard = self.shard(key).lock();
        let (slot, created) = match shard.get(&key) {
            Some(slot) => (Arc::clone(slot), false),
            None => {
                let slot: Slot<V> = Arc::new(Mutex::new(None));
                shard.insert(key, Arc::clone(&slot));
                (slot, true)
            }
        };

        let entry = if created {
            let entry = slot.lock();
            drop(shard);
            entry
        } else {
            drop(shard);
            slot.lock()
        };

        let first = entry.is_none();
        let mut guard = InstanceGuard { key, first, entry };
        f(&mut guard)
    }

    /// Value published for `key`, if any.
    pub fn get(&self, key: u64) -> Option<V>
    where
        V: Clone,
    {
        let slot = self.shard(key).lock().get(&key).cloned()?;
        let value = slot.lock().clone();
        value
    }

    pub fn contains(&self, key: u64) -> bool {
        self.shard(key).lock().contains_key(&key)
    }

    /// Number of entries across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> InstanceRegistry<Arc<T>> {
    /// Drop entries whose value is referenced by nobody but this table.
    ///
    /// Entries that are currently locked by a registration are kept.
    pub fn garbage_collect(&self) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            shard.lock().retain(|_, slot| {
                if Arc::strong_count(slot) > 1 {
                    return true;
                }
                let Some(entry) = slot.try_lock() else {
                    return true;
                };
                let keep = entry.as_ref().is_some_and(|v| Arc::strong_count(v) > 1);
                if !keep {
                    removed += 1;
                }
                keep
            });
        }
        removed
    }
}

/// Scoped access to one locked registry entry.
pub struct InstanceGuard<'a, V> {
    key: u64,
    first: bool,
    entry: MutexGuard<'a, Option<V>>,
}

impl<V> InstanceGuard<'_, V> {
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Whether no value had been published when the lock was acquired.
    pub fn is_first_instance(&self) -> bool {
        self.first
    }

    pub fn value(&self) -> Option<&V> {
        self.entry.as_ref()
    }

    /// Publish the shared value.
    pub fn set_value(&mut self, value: V) {
        if self.entry.is_some() {
            log::error!("instance {:#x} already holds a value", self.key);
        }
        *self.entry = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn first_instance_publishes() {
        let registry = InstanceRegistry::<Arc<i32>>::new();
        let first = registry.register(1, |instance| {
            assert!(instance.is_first_instance());
            instance.set_value(Arc::new(5));
            instance.value().cloned()
        });
        let second = registry.register(1, |instance| {
            assert!(!instance.is_first_instance());
            instance.value().cloned()
        });
        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unpublished_entry_stays_first() {
        let registry = InstanceRegistry::<Arc<i32>>::new();
        registry.register(3, |_| ());
        assert!(registry.register(3, |instance| instance.is_first_instance()));
        assert_eq!(registry.get(3), None);
    }

    #[test]
    fn concurrent_registration_constructs_once() {
        let registry = InstanceRegistry::<Arc<usize>>::new();
        let constructions = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        let values: Vec<Arc<usize>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        registry.register(42, |instance| {
                            if instance.is_first_instance() {
                                constructions.fetch_add(1, Ordering::SeqCst);
                                std::thread::sleep(std::time::Duration::from_millis(5));
                                instance.set_value(Arc::new(99));
                            }
                            instance.value().cloned().unwrap()
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }

    #[test]
    fn garbage_collect_drops_unreferenced() {
        let registry = InstanceRegistry::<Arc<i32>>::new();
        let held = registry.register(1, |instance| {
            instance.set_value(Arc::new(1));
            instance.value().cloned().unwrap()
        });
        registry.register(2, |instance| instance.set_value(Arc::new(2)));

        assert_eq!(registry.garbage_collect(), 1);
        assert!(registry.contains(1));
        assert!(!registry.contains(2));

        drop(held);
        assert_eq!(registry.garbage_collect(), 1);
        assert!(registry.is_empty());
    }
}
