use std::collections::BTreeSet;

use ahash::HashMap;
use parking_lot::RwLock;

use super::error::StoreError;
use super::types::{Filter, FilterId, RegisteredFilter};
use crate::models::StdAddr;

/// Set of active filters.
pub trait FilterStore: Send + Sync {
    /// Inserts a filter or replaces the one with the same name.
    ///
    /// Replacing a filter keeps its id.
    fn register(&self, filter: Filter) -> Result<FilterId, StoreError>;

    /// Removes a filter by name. Unknown names are ignored.
    fn unregister(&self, name: &str) -> Result<(), StoreError>;

    fn has(&self, name: &str) -> Result<bool, StoreError>;

    /// Returns all addresses watched by at least one filter.
    fn distinct_addresses(&self) -> Result<Vec<StdAddr>, StoreError>;

    /// Returns filters registered for the address and topic, ordered by id.
    fn matching(&self, address: &StdAddr, topic: u32)
        -> Result<Vec<RegisteredFilter>, StoreError>;
}

/// Filter store which keeps everything in memory.
#[derive(Default)]
pub struct InMemoryFilterStore {
    inner: RwLock<Filters>,
}

#[derive(Default)]
struct Filters {
    next_id: FilterId,
    ids: HashMap<String, FilterId>,
    filters: HashMap<FilterId, Filter>,
    by_address: HashMap<StdAddr, HashMap<u32, BTreeSet<FilterId>>>,
}

impl Filters {
    fn unindex(&mut self, id: FilterId, address: &StdAddr, topic: u32) {
        let Some(topics) = self.by_address.get_mut(address) else {
            return;
        };
        if let Some(ids) = topics.get_mut(&topic) {
            ids.remove(&id);
            if ids.is_empty() {
                topics.remove(&topic);
            }
        }
        if topics.is_empty() {
            self.by_address.remove(address);
        }
    }
}

impl InMemoryFilterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FilterStore for InMemoryFilterStore {
    fn register(&self, filter: Filter) -> Result<FilterId, StoreError> {
        let mut inner = self.inner.write();

        let existing = inner.ids.get(&filter.name).copied();
        let id = match existing {
            Some(id) => {
                if let Some(old) = inner.filters.remove(&id) {
                    inner.unindex(id, &old.address, old.event_topic);
                }
                id
            }
            None => {
                inner.next_id += 1;
                let id = inner.next_id;
                inner.ids.insert(filter.name.clone(), id);
                id
            }
        };

        inner
            .by_address
            .entry(filter.address)
            .or_default()
            .entry(filter.event_topic)
            .or_default()
            .insert(id);

        tracing::debug!(
            id,
            name = %filter.name,
            address = %filter.address,
            topic = filter.event_topic,
            "registered filter"
        );
        inner.filters.insert(id, filter);
        Ok(id)
    }

    fn unregister(&self, name: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let Some(id) = inner.ids.remove(name) else {
            return Ok(());
        };
        if let Some(filter) = inner.filters.remove(&id) {
            inner.unindex(id, &filter.address, filter.event_topic);
        }
        tracing::debug!(id, name, "unregistered filter");
        Ok(())
    }

    fn has(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().ids.contains_key(name))
    }

    fn distinct_addresses(&self) -> Result<Vec<StdAddr>, StoreError> {
        let mut addresses = self
            .inner
            .read()
            .by_address
            .keys()
            .copied()
            .collect::<Vec<_>>();
        addresses.sort_unstable();
        Ok(addresses)
    }

    fn matching(
        &self,
        address: &StdAddr,
        topic: u32,
    ) -> Result<Vec<RegisteredFilter>, StoreError> {
        let inner = self.inner.read();
        let Some(ids) = inner.by_address.get(address).and_then(|t| t.get(&topic)) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| {
                let filter = inner.filters.get(id)?;
                Some(RegisteredFilter {
                    id: *id,
                    filter: filter.clone(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::HashBytes;

    fn addr(byte: u8) -> StdAddr {
        StdAddr::new(0, HashBytes([byte; 32]))
    }

    fn ids(filters: Vec<RegisteredFilter>) -> Vec<FilterId> {
        filters.into_iter().map(|f| f.id).collect()
    }

    #[test]
    fn filters_are_isolated_by_address() {
        let store = InMemoryFilterStore::new();
        let a = store.register(Filter::new("A", addr(1), 1)).unwrap();
        let b = store.register(Filter::new("B", addr(2), 1)).unwrap();
        assert_ne!(a, b);

        assert_eq!(ids(store.matching(&addr(1), 1).unwrap()), [a]);
        assert_eq!(ids(store.matching(&addr(2), 1).unwrap()), [b]);
        assert!(store.matching(&addr(1), 2).unwrap().is_empty());
        assert!(store.matching(&addr(3), 1).unwrap().is_empty());
    }

    #[test]
    fn register_and_unregister() {
        let store = InMemoryFilterStore::new();
        assert!(!store.has("A").unwrap());

        let id = store.register(Filter::new("A", addr(1), 1)).unwrap();
        store.register(Filter::new("B", addr(1), 2)).unwrap();
        store.register(Filter::new("C", addr(2), 1)).unwrap();
        assert!(store.has("A").unwrap());
        assert_eq!(store.distinct_addresses().unwrap(), [addr(1), addr(2)]);

        // Re-registration keeps the id and moves the index entry
        let same = store.register(Filter::new("A", addr(3), 7)).unwrap();
        assert_eq!(same, id);
        assert!(store.matching(&addr(1), 1).unwrap().is_empty());
        assert_eq!(ids(store.matching(&addr(3), 7).unwrap()), [id]);

        store.unregister("B").unwrap();
        store.unregister("unknown").unwrap();
        assert!(!store.has("B").unwrap());
        assert_eq!(store.distinct_addresses().unwrap(), [addr(2), addr(3)]);

        store.unregister("A").unwrap();
        store.unregister("C").unwrap();
        assert!(store.distinct_addresses().unwrap().is_empty());
    }

    #[test]
    fn shared_topic() {
        let store = InMemoryFilterStore::new();
        let a = store.register(Filter::new("A", addr(1), 1)).unwrap();
        let b = store.register(Filter::new("B", addr(1), 1)).unwrap();
        assert_eq!(ids(store.matching(&addr(1), 1).unwrap()), [a, b]);

        store.unregister("A").unwrap();
        assert_eq!(ids(store.matching(&addr(1), 1).unwrap()), [b]);
        assert_eq!(store.distinct_addresses().unwrap(), [addr(1)]);
    }
}
