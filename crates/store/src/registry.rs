//! Per-parent store registry.
//!
//! One registry per entity kind (character profiles, character images,
//! moodboard items). Stores are created lazily on first access and seeded
//! with a refresh, so callers always read a populated cache. The registry
//! is the seam the orchestrator uses to persist artifacts for whichever
//! parents a batch spans.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use atelier_core::error::CoreError;
use atelier_core::types::DbId;
use atelier_core::version::VersionPayload;
use atelier_events::EventBus;

use crate::gateway::PersistenceGateway;
use crate::store::VersionStore;

/// Lazily-populated map of parent id to [`VersionStore`].
pub struct StoreRegistry<P: VersionPayload> {
    entity: &'static str,
    gateway: Arc<dyn PersistenceGateway<P>>,
    bus: Arc<EventBus>,
    stores: RwLock<HashMap<DbId, Arc<VersionStore<P>>>>,
}

impl<P: VersionPayload> StoreRegistry<P> {
    pub fn new(
        entity: &'static str,
        gateway: Arc<dyn PersistenceGateway<P>>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            entity,
            gateway,
            bus,
            stores: RwLock::new(HashMap::new()),
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// The store for one parent, created and refreshed on first access.
    pub async fn store_for(&self, parent_id: DbId) -> Result<Arc<VersionStore<P>>, CoreError> {
        if let Some(store) = self.stores.read().await.get(&parent_id) {
            return Ok(Arc::clone(store));
        }

        let mut stores = self.stores.write().await;
        // A concurrent caller may have created it while we waited.
        if let Some(store) = stores.get(&parent_id) {
            return Ok(Arc::clone(store));
        }

        let store = Arc::new(VersionStore::new(
            self.entity,
            parent_id,
            Arc::clone(&self.gateway),
            Arc::clone(&self.bus),
        ));
        store.refresh().await?;
        stores.insert(parent_id, Arc::clone(&store));
        Ok(store)
    }
}
