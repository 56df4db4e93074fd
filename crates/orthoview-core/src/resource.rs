//! Per-layer display resources of a slice window.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::source::LayerId;

/// Allocates and releases the display-side resource of one image layer
/// (a texture, typically). The core never looks inside a resource.
pub trait LayerResourceFactory {
    type Resource;

    fn create(&mut self, layer: LayerId) -> Self::Resource;

    fn release(&mut self, layer: LayerId, resource: Self::Resource);
}

/// Opaque handle handed out by [`KeyFactory`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey(pub u64);

impl fmt::Debug for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKey({})", self.0)
    }
}

/// Factory issuing sequential [`ResourceKey`]s, for callers that manage
/// the real resources elsewhere.
#[derive(Debug, Default)]
pub struct KeyFactory {
    next: u64,
    live: usize,
}

impl KeyFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys created and not yet released.
    pub fn live(&self) -> usize {
        self.live
    }
}

impl LayerResourceFactory for KeyFactory {
    type Resource = ResourceKey;

    fn create(&mut self, _layer: LayerId) -> ResourceKey {
        let key = ResourceKey(self.next);
        self.next += 1;
        self.live += 1;
        key
    }

    fn release(&mut self, _layer: LayerId, _resource: ResourceKey) {
        self.live -= 1;
    }
}

/// Which layers gained or lost a resource in one [`LayerResourceMap::sync`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<LayerId>,
    pub released: Vec<LayerId>,
}

impl SyncReport {
    pub fn is_unchanged(&self) -> bool {
        self.created.is_empty() && self.released.is_empty()
    }
}

/// One resource per attached layer.
pub struct LayerResourceMap<R> {
    entries: BTreeMap<LayerId, R>,
}

impl<R> LayerResourceMap<R> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, layer: LayerId) -> bool {
        self.entries.contains_key(&layer)
    }

    pub fn get(&self, layer: LayerId) -> Option<&R> {
        self.entries.get(&layer)
    }

    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.entries.keys().copied()
    }

    /// Make the map mirror `layers`: new layers get a fresh resource, gone
    /// layers have theirs released, and kept layers keep the very same
    /// resource.
    pub fn sync<F>(&mut self, layers: &[LayerId], factory: &mut F) -> SyncReport
    where
        F: LayerResourceFactory<Resource = R>,
    {
        let mut previous = std::mem::take(&mut self.entries);
        let mut report = SyncReport::default();

        for &layer in layers {
            if self.entries.contains_key(&layer) {
                continue;
            }
            let resource = match previous.remove(&layer) {
                Some(existing) => existing,
                None => {
                    report.created.push(layer);
                    factory.create(layer)
                }
            };
            self.entries.insert(layer, resource);
        }

        for (layer, resource) in previous {
            factory.release(layer, resource);
            report.released.push(layer);
        }

        if !report.is_unchanged() {
            debug!(
                created = ?report.created,
                released = ?report.released,
                total = self.entries.len(),
                "Layer resources synchronized"
            );
        }
        report
    }

    /// Release every resource, leaving the map empty.
    pub fn release_all<F>(&mut self, factory: &mut F)
    where
        F: LayerResourceFactory<Resource = R>,
    {
        for (layer, resource) in std::mem::take(&mut self.entries) {
            factory.release(layer, resource);
        }
    }
}

impl<R> Default for LayerResourceMap<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: fmt::Debug> fmt::Debug for LayerResourceMap<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_keeps_existing_handles() {
        let mut factory = KeyFactory::new();
        let mut map = LayerResourceMap::new();
        let (a, b) = (LayerId(1), LayerId(2));

        let report = map.sync(&[a, b], &mut factory);
        assert_eq!(report.created, vec![a, b]);
        let key_b = *map.get(b).unwrap();

        let report = map.sync(&[b], &mut factory);
        assert_eq!(report.released, vec![a]);
        assert!(report.created.is_empty());
        assert_eq!(map.get(b), Some(&key_b));
        assert_eq!(factory.live(), 1);
    }

    #[test]
    fn test_duplicate_layers_get_one_entry() {
        let mut factory = KeyFactory::new();
        let mut map = LayerResourceMap::new();
        map.sync(&[LayerId(3), LayerId(3)], &mut factory);
        assert_eq!(map.len(), 1);
        assert_eq!(factory.live(), 1);
    }

    #[test]
    fn test_release_all() {
        let mut factory = KeyFactory::new();
        let mut map = LayerResourceMap::new();
        map.sync(&[LayerId(0), LayerId(1)], &mut factory);
        map.release_all(&mut factory);
        assert!(map.is_empty());
        assert_eq!(factory.live(), 0);
    }
}
