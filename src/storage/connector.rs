use super::memory::InMemoryOrderedSetStore;
use super::persistence::ClusterSnapshot;
use super::store::OrderedSetStore;
use crate::core::{GraphError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// Hands out store handles for storage endpoints.
///
/// Handles are acquired once at startup and injected into partitions and the
/// cache; they live as long as the topology holding them.
pub trait StoreConnector: Send + Sync {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn OrderedSetStore>>;
}

/// Connector backed by process-local stores, one per distinct endpoint.
///
/// Stores are unbounded: they hold adjacency lists, which must never be evicted.
#[derive(Default)]
pub struct InMemoryConnector {
    stores: Mutex<HashMap<String, Arc<InMemoryOrderedSetStore>>>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn store_for(&self, endpoint: &str) -> Result<Arc<InMemoryOrderedSetStore>> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(GraphError::ConfigInvariantViolation(
                "storage endpoint must not be empty".to_string(),
            ));
        }
        let mut stores = self.stores.lock()?;
        let store = stores
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(InMemoryOrderedSetStore::new(endpoint)));
        Ok(store.clone())
    }

    /// Returns the concrete store for an endpoint if one was created.
    pub fn store(&self, endpoint: &str) -> Result<Option<Arc<InMemoryOrderedSetStore>>> {
        Ok(self.stores.lock()?.get(endpoint.trim()).cloned())
    }

    pub fn snapshot(&self) -> Result<ClusterSnapshot> {
        let stores = self.stores.lock()?;
        let mut exported = BTreeMap::new();
        for (endpoint, store) in stores.iter() {
            exported.insert(endpoint.clone(), store.export()?);
        }
        Ok(ClusterSnapshot::new(exported))
    }

    /// Loads every store of `snapshot`, creating stores for unseen endpoints.
    ///
    /// Returns the number of keys restored.
    pub fn restore(&self, snapshot: ClusterSnapshot) -> Result<usize> {
        let mut restored = 0;
        for (endpoint, store_snapshot) in snapshot.stores {
            restored += self.store_for(&endpoint)?.import(store_snapshot)?;
        }
        Ok(restored)
    }
}

impl StoreConnector for InMemoryConnector {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn OrderedSetStore>> {
        let store: Arc<dyn OrderedSetStore> = self.store_for(endpoint)?;
        Ok(store)
    }
}
