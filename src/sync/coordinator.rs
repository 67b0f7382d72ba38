//! Category sync coordinator.
//!
//! The coordinator is the single authority over the locally cached category
//! list: every read and write against the record store goes through it, and
//! the cache it owns is the only category state the presentation layer
//! observes.
//!
//! Mutations are never optimistic. The remote call runs first, outside the
//! cache lock, and the cache is touched in one atomic step only after the
//! store confirms, so no observer ever sees partial state and a failed call
//! leaves the cache exactly as it was.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Category;
use crate::store::{RecordStore, StoreError};

#[derive(Default)]
struct CacheState {
    categories: Vec<Category>,
    /// Ids confirmed deleted. Deleting one again succeeds (idempotence);
    /// an id in neither the cache nor here was never known and is NotFound.
    tombstones: HashSet<Uuid>,
    /// Bumped on every confirmed mutation. A full reload only replaces the
    /// cache if no mutation landed while its fetch was in flight, so a
    /// stale fetch can never resurrect a deleted category.
    epoch: u64,
}

/// Single owner of the category cache.
pub struct SyncCoordinator<S> {
    store: Arc<S>,
    state: RwLock<CacheState>,
    loading: AtomicBool,
}

impl<S: RecordStore> SyncCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: RwLock::new(CacheState::default()),
            loading: AtomicBool::new(false),
        }
    }

    /// Returns the store this coordinator writes through.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// True while a full category load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Cloned snapshot of the cached categories, in cache order.
    pub async fn categories(&self) -> Vec<Category> {
        self.state.read().await.categories.clone()
    }

    /// Looks up a cached category by exact name match.
    pub async fn find_by_name(&self, name: &str) -> Option<Category> {
        self.state
            .read()
            .await
            .categories
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Fetches all categories from the store and replaces the cache.
    ///
    /// At most one load runs at a time; a call made while another is in
    /// flight coalesces into it and returns immediately. On failure the
    /// cache keeps its previous contents so the caller can keep showing
    /// them alongside an error indicator.
    pub async fn load_categories(&self) -> Result<(), StoreError> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("category load already in flight, coalescing");
            return Ok(());
        }

        let start_epoch = self.state.read().await.epoch;
        let result = self.store.fetch_all_categories().await;

        let outcome = match result {
            Ok(fetched) => {
                let mut state = self.state.write().await;
                if state.epoch == start_epoch {
                    debug!(count = fetched.len(), "category cache replaced from store");
                    state.categories = fetched;
                } else {
                    // A create/edit/delete confirmed while we were fetching;
                    // the fetched snapshot predates it. Drop it.
                    debug!("discarding stale category load result");
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "category load failed, cache left unchanged");
                Err(e)
            }
        };

        self.loading.store(false, Ordering::SeqCst);
        outcome
    }

    /// Creates a category and appends the store-assigned record to the cache.
    pub async fn create_category(&self, name: &str, icon: &str) -> Result<Category, StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::ValidationRejected(
                "category name must not be empty".to_string(),
            ));
        }

        let category = self.store.create_category(name, icon).await?;

        let mut state = self.state.write().await;
        state.epoch += 1;
        // A full load whose fetch ran after the store-side create may have
        // already brought this record into the cache; ids stay unique.
        if !state.categories.iter().any(|c| c.id == category.id) {
            state.categories.push(category.clone());
        }
        debug!(id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    /// Renames a category and/or changes its icon.
    ///
    /// The cached entry is mutated only after the store confirms, so a
    /// failed update leaves no local divergence to reconcile.
    pub async fn edit_category(&self, id: Uuid, name: &str, icon: &str) -> Result<(), StoreError> {
        {
            let state = self.state.read().await;
            if !state.categories.iter().any(|c| c.id == id) {
                return Err(StoreError::NotFound(id));
            }
        }
        if name.trim().is_empty() {
            return Err(StoreError::ValidationRejected(
                "category name must not be empty".to_string(),
            ));
        }

        self.store.update_category(id, name, icon).await?;

        let mut state = self.state.write().await;
        state.epoch += 1;
        // Absent here means a delete confirmed between our check and the
        // store round-trip; the tombstone wins.
        if let Some(category) = state.categories.iter_mut().find(|c| c.id == id) {
            category.name = name.to_string();
            category.icon = icon.to_string();
            category.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    /// Deletes a category. Recipes filed under it are removed by the store
    /// as part of the delete (see [`RecordStore::delete_category`]).
    ///
    /// Idempotent: deleting an id that was already confirmed deleted, or
    /// that the store reports absent, succeeds. Only an id this coordinator
    /// has never seen is `NotFound`.
    pub async fn delete_category(&self, id: Uuid) -> Result<(), StoreError> {
        {
            let state = self.state.read().await;
            if !state.categories.iter().any(|c| c.id == id) {
                if state.tombstones.contains(&id) {
                    return Ok(());
                }
                return Err(StoreError::NotFound(id));
            }
        }

        match self.store.delete_category(id).await {
            // The store already reflecting the deletion is still a
            // confirmed delete.
            Ok(()) | Err(StoreError::NotFound(_)) => {
                let mut state = self.state.write().await;
                state.epoch += 1;
                state.categories.retain(|c| c.id != id);
                state.tombstones.insert(id);
                debug!(%id, "category deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecipeRecord;
    use crate::store::{MemoryStore, StoreOp};
    use async_trait::async_trait;
    use tokio::sync::{oneshot, Mutex};

    fn coordinator() -> SyncCoordinator<MemoryStore> {
        SyncCoordinator::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_load_replaces_cache() {
        let store = Arc::new(MemoryStore::new());
        store.create_category("Soups", "bowl").await.unwrap();
        store.create_category("Salads", "leaf").await.unwrap();

        let coordinator = SyncCoordinator::new(store);
        coordinator.load_categories().await.unwrap();

        let cached = coordinator.categories().await;
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].name, "Soups");
        assert_eq!(cached[1].name, "Salads");
    }

    #[tokio::test]
    async fn test_load_failure_leaves_cache() {
        let coordinator = coordinator();
        coordinator.create_category("Soups", "bowl").await.unwrap();

        coordinator
            .store()
            .fail_next(StoreOp::FetchAll, StoreError::Unavailable("down".into()))
            .await;

        let err = coordinator.load_categories().await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(coordinator.categories().await.len(), 1);
        assert!(!coordinator.is_loading());
    }

    #[tokio::test]
    async fn test_cache_tracks_store_through_serial_mutations() {
        let coordinator = coordinator();

        let soups = coordinator.create_category("Soups", "bowl").await.unwrap();
        let salads = coordinator.create_category("Salads", "leaf").await.unwrap();
        assert_eq!(
            coordinator.categories().await,
            coordinator.store().categories().await
        );

        coordinator
            .edit_category(soups.id, "Hot Soups", "flame")
            .await
            .unwrap();
        let cached = coordinator.categories().await;
        let stored = coordinator.store().categories().await;
        assert_eq!(cached.len(), stored.len());
        for (c, s) in cached.iter().zip(stored.iter()) {
            assert_eq!((c.id, &c.name, &c.icon), (s.id, &s.name, &s.icon));
        }

        coordinator.delete_category(salads.id).await.unwrap();
        let cached = coordinator.categories().await;
        let stored = coordinator.store().categories().await;
        assert_eq!(
            cached.iter().map(|c| c.id).collect::<Vec<_>>(),
            stored.iter().map(|c| c.id).collect::<Vec<_>>()
        );
        assert_eq!(cached[0].name, "Hot Soups");
    }

    #[tokio::test]
    async fn test_find_by_name_exact_match_only() {
        let coordinator = coordinator();
        let soups = coordinator.create_category("Soups", "bowl").await.unwrap();

        let found = coordinator.find_by_name("Soups").await;
        assert_eq!(found.map(|c| c.id), Some(soups.id));
        assert!(coordinator.find_by_name("soups").await.is_none());
        assert!(coordinator.find_by_name("Soups ").await.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name_before_store() {
        let coordinator = coordinator();
        let err = coordinator.create_category("  ", "bowl").await.unwrap_err();
        assert!(matches!(err, StoreError::ValidationRejected(_)));
        assert!(coordinator.store().categories().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_leaves_cache() {
        let coordinator = coordinator();
        coordinator
            .store()
            .fail_next(
                StoreOp::CreateCategory,
                StoreError::Unavailable("down".into()),
            )
            .await;

        assert!(coordinator.create_category("Soups", "bowl").await.is_err());
        assert!(coordinator.categories().await.is_empty());
    }

    #[tokio::test]
    async fn test_edit_unknown_id() {
        let coordinator = coordinator();
        let err = coordinator
            .edit_category(Uuid::new_v4(), "New", "icon")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_edit_failure_keeps_cached_entry() {
        let coordinator = coordinator();
        let soups = coordinator.create_category("Soups", "bowl").await.unwrap();

        coordinator
            .store()
            .fail_next(
                StoreOp::UpdateCategory,
                StoreError::Unavailable("down".into()),
            )
            .await;

        assert!(coordinator
            .edit_category(soups.id, "Hot Soups", "flame")
            .await
            .is_err());
        let cached = coordinator.categories().await;
        assert_eq!(cached[0].name, "Soups");
        assert_eq!(cached[0].icon, "bowl");
    }

    #[tokio::test]
    async fn test_delete_twice_succeeds() {
        let coordinator = coordinator();
        let soups = coordinator.create_category("Soups", "bowl").await.unwrap();

        coordinator.delete_category(soups.id).await.unwrap();
        coordinator.delete_category(soups.id).await.unwrap();
        assert!(coordinator.categories().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_never_known_id() {
        let coordinator = coordinator();
        let err = coordinator.delete_category(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_tolerates_store_not_found() {
        let coordinator = coordinator();
        let soups = coordinator.create_category("Soups", "bowl").await.unwrap();

        // Another device already deleted it on the store side.
        coordinator
            .store()
            .fail_next(StoreOp::DeleteCategory, StoreError::NotFound(soups.id))
            .await;

        coordinator.delete_category(soups.id).await.unwrap();
        assert!(coordinator.categories().await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_recipe_flows_through_store() {
        let coordinator = coordinator();
        let soups = coordinator.create_category("Soups", "bowl").await.unwrap();
        let record =
            RecipeRecord::from_exported(&crate::models::ExportedRecipe::new("Pho", "Soups", 120));
        coordinator
            .store()
            .persist_recipe(soups.id, &record)
            .await
            .unwrap();
        assert_eq!(coordinator.store().recipe_count().await, 1);
    }

    /// Store wrapper whose fetch completes against the inner store first,
    /// then parks until released, yielding a deterministically stale
    /// snapshot. Signals through `parked` once the snapshot is in hand.
    struct GatedFetchStore {
        inner: MemoryStore,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        parked: Mutex<Option<oneshot::Sender<()>>>,
    }

    impl GatedFetchStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                gate: Mutex::new(None),
                parked: Mutex::new(None),
            }
        }

        /// Arms the gate for the next fetch. Returns the release handle and
        /// a receiver resolved once the fetch has parked.
        async fn arm(&self) -> (oneshot::Sender<()>, oneshot::Receiver<()>) {
            let (release, gate) = oneshot::channel();
            let (parked_tx, parked_rx) = oneshot::channel();
            *self.gate.lock().await = Some(gate);
            *self.parked.lock().await = Some(parked_tx);
            (release, parked_rx)
        }
    }

    #[async_trait]
    impl RecordStore for GatedFetchStore {
        async fn fetch_all_categories(&self) -> Result<Vec<Category>, StoreError> {
            let snapshot = self.inner.fetch_all_categories().await?;
            let gate = self.gate.lock().await.take();
            if let Some(rx) = gate {
                if let Some(tx) = self.parked.lock().await.take() {
                    let _ = tx.send(());
                }
                let _ = rx.await;
            }
            Ok(snapshot)
        }

        async fn create_category(&self, name: &str, icon: &str) -> Result<Category, StoreError> {
            self.inner.create_category(name, icon).await
        }

        async fn update_category(
            &self,
            id: Uuid,
            name: &str,
            icon: &str,
        ) -> Result<(), StoreError> {
            self.inner.update_category(id, name, icon).await
        }

        async fn delete_category(&self, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete_category(id).await
        }

        async fn persist_recipe(
            &self,
            category_id: Uuid,
            recipe: &RecipeRecord,
        ) -> Result<(), StoreError> {
            self.inner.persist_recipe(category_id, recipe).await
        }
    }

    #[tokio::test]
    async fn test_stale_load_does_not_resurrect_deleted_category() {
        let inner = MemoryStore::new();
        let soups = inner.create_category("Soups", "bowl").await.unwrap();
        let store = Arc::new(GatedFetchStore::new(inner));
        let coordinator = Arc::new(SyncCoordinator::new(store));

        coordinator.load_categories().await.unwrap();
        assert_eq!(coordinator.categories().await.len(), 1);

        // Park the next load with a snapshot that still contains Soups,
        // then delete Soups while it waits.
        let (release, parked) = coordinator.store().arm().await;
        let load = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.load_categories().await })
        };
        parked.await.unwrap();

        coordinator.delete_category(soups.id).await.unwrap();
        assert!(coordinator.categories().await.is_empty());

        release.send(()).ok();
        load.await.unwrap().unwrap();

        // The stale snapshot contained Soups; it must have been discarded.
        assert!(coordinator.categories().await.is_empty());
    }

    /// Store wrapper whose create completes against the inner store first,
    /// then parks until released, holding the window between store
    /// confirmation and the coordinator's cache apply open.
    struct GatedCreateStore {
        inner: MemoryStore,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        parked: Mutex<Option<oneshot::Sender<()>>>,
    }

    impl GatedCreateStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                gate: Mutex::new(None),
                parked: Mutex::new(None),
            }
        }

        async fn arm(&self) -> (oneshot::Sender<()>, oneshot::Receiver<()>) {
            let (release, gate) = oneshot::channel();
            let (parked_tx, parked_rx) = oneshot::channel();
            *self.gate.lock().await = Some(gate);
            *self.parked.lock().await = Some(parked_tx);
            (release, parked_rx)
        }
    }

    #[async_trait]
    impl RecordStore for GatedCreateStore {
        async fn fetch_all_categories(&self) -> Result<Vec<Category>, StoreError> {
            self.inner.fetch_all_categories().await
        }

        async fn create_category(&self, name: &str, icon: &str) -> Result<Category, StoreError> {
            let category = self.inner.create_category(name, icon).await?;
            let gate = self.gate.lock().await.take();
            if let Some(rx) = gate {
                if let Some(tx) = self.parked.lock().await.take() {
                    let _ = tx.send(());
                }
                let _ = rx.await;
            }
            Ok(category)
        }

        async fn update_category(
            &self,
            id: Uuid,
            name: &str,
            icon: &str,
        ) -> Result<(), StoreError> {
            self.inner.update_category(id, name, icon).await
        }

        async fn delete_category(&self, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete_category(id).await
        }

        async fn persist_recipe(
            &self,
            category_id: Uuid,
            recipe: &RecipeRecord,
        ) -> Result<(), StoreError> {
            self.inner.persist_recipe(category_id, recipe).await
        }
    }

    #[tokio::test]
    async fn test_load_racing_create_does_not_duplicate_category() {
        let store = Arc::new(GatedCreateStore::new(MemoryStore::new()));
        let coordinator = Arc::new(SyncCoordinator::new(store));

        // Park the create after the store confirmed it but before the
        // cache apply, then let a full load observe the store-side record.
        let (release, parked) = coordinator.store().arm().await;
        let create = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.create_category("Soups", "bowl").await })
        };
        parked.await.unwrap();

        coordinator.load_categories().await.unwrap();
        assert_eq!(coordinator.categories().await.len(), 1);

        release.send(()).ok();
        let created = create.await.unwrap().unwrap();

        // The load already cached the record; the create must not push a
        // second entry with the same id.
        let cached = coordinator.categories().await;
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].id, created.id);
    }

    #[tokio::test]
    async fn test_concurrent_load_coalesces() {
        let inner = MemoryStore::new();
        inner.create_category("Soups", "bowl").await.unwrap();
        let store = Arc::new(GatedFetchStore::new(inner));
        let coordinator = Arc::new(SyncCoordinator::new(store));

        let (release, parked) = coordinator.store().arm().await;
        let load = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.load_categories().await })
        };
        parked.await.unwrap();
        assert!(coordinator.is_loading());

        // Second call returns immediately without a second fetch.
        coordinator.load_categories().await.unwrap();
        assert!(coordinator.is_loading());

        release.send(()).ok();
        load.await.unwrap().unwrap();
        assert!(!coordinator.is_loading());
        assert_eq!(coordinator.categories().await.len(), 1);
    }
}
