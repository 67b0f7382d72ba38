//! In-memory record store.
//!
//! Reference implementation of [`RecordStore`] used by the crate's own
//! tests and available to downstream callers that want an offline backend.
//! Supports scripted failure injection so callers can exercise partial
//! failure paths.

use std::collections::{HashMap, VecDeque};

use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RecordStore, StoreError};
use crate::models::{Category, RecipeRecord};

/// Store operations that can have failures queued against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FetchAll,
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
    PersistRecipe,
}

#[derive(Default)]
struct Inner {
    categories: Vec<Category>,
    /// Recipes keyed by owning category id.
    recipes: HashMap<Uuid, Vec<RecipeRecord>>,
    /// Queued failures, consumed one per matching operation.
    failures: HashMap<StoreOp, VecDeque<StoreError>>,
}

impl Inner {
    fn take_failure(&mut self, op: StoreOp) -> Option<StoreError> {
        self.failures.get_mut(&op).and_then(|queue| queue.pop_front())
    }
}

/// In-memory [`RecordStore`] with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with the given categories.
    pub fn with_categories(categories: Vec<Category>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                categories,
                ..Inner::default()
            }),
        }
    }

    /// Queues an error to be returned by the next call of `op`.
    ///
    /// Multiple queued errors are consumed in order; once the queue for an
    /// operation is empty, calls succeed again.
    pub async fn fail_next(&self, op: StoreOp, error: StoreError) {
        let mut inner = self.inner.lock().await;
        inner.failures.entry(op).or_default().push_back(error);
    }

    /// Snapshot of the stored categories.
    pub async fn categories(&self) -> Vec<Category> {
        self.inner.lock().await.categories.clone()
    }

    /// Snapshot of the recipes filed under a category.
    pub async fn recipes_for(&self, category_id: Uuid) -> Vec<RecipeRecord> {
        self.inner
            .lock()
            .await
            .recipes
            .get(&category_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of stored recipes across all categories.
    pub async fn recipe_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .recipes
            .values()
            .map(Vec::len)
            .sum()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_all_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(err) = inner.take_failure(StoreOp::FetchAll) {
            return Err(err);
        }
        Ok(inner.categories.clone())
    }

    async fn create_category(&self, name: &str, icon: &str) -> Result<Category, StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(err) = inner.take_failure(StoreOp::CreateCategory) {
            return Err(err);
        }
        if name.trim().is_empty() {
            return Err(StoreError::ValidationRejected(
                "category name must not be empty".to_string(),
            ));
        }
        let category = Category::new(name, icon);
        inner.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: Uuid, name: &str, icon: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(err) = inner.take_failure(StoreOp::UpdateCategory) {
            return Err(err);
        }
        if name.trim().is_empty() {
            return Err(StoreError::ValidationRejected(
                "category name must not be empty".to_string(),
            ));
        }
        let category = inner
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound(id))?;
        category.name = name.to_string();
        category.icon = icon.to_string();
        category.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(err) = inner.take_failure(StoreOp::DeleteCategory) {
            return Err(err);
        }
        let before = inner.categories.len();
        inner.categories.retain(|c| c.id != id);
        if inner.categories.len() == before {
            return Err(StoreError::NotFound(id));
        }
        // Cascade: recipes filed under the category go with it.
        inner.recipes.remove(&id);
        Ok(())
    }

    async fn persist_recipe(
        &self,
        category_id: Uuid,
        recipe: &RecipeRecord,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(err) = inner.take_failure(StoreOp::PersistRecipe) {
            return Err(err);
        }
        if !inner.categories.iter().any(|c| c.id == category_id) {
            return Err(StoreError::NotFound(category_id));
        }
        let filed = inner.recipes.entry(category_id).or_default();
        // import_key is the record identity: re-persisting replaces.
        if let Some(existing) = filed
            .iter_mut()
            .find(|r| r.import_key == recipe.import_key)
        {
            *existing = recipe.clone();
        } else {
            filed.push(recipe.clone());
        }
        Ok(())
    }
}
