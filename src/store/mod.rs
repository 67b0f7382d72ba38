//! Record store abstraction.
//!
//! The record store is the remote, eventually-consistent backend holding
//! categories and recipes. The core only ever talks to it through the
//! [`RecordStore`] trait; the concrete transport (cloud record API, local
//! database, ...) lives outside this crate. [`MemoryStore`] is the in-crate
//! reference implementation.

mod memory;

pub use memory::{MemoryStore, StoreOp};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Category, RecipeRecord};

/// Errors a record store operation can surface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Transient network or service failure. Retryable by the caller.
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// Permission or credential failure. Not retryable without user action.
    #[error("Record store authorization failed: {0}")]
    Auth(String),

    /// The store rejected the record data.
    #[error("Record rejected: {0}")]
    ValidationRejected(String),

    /// The referenced record does not exist.
    #[error("Record not found: {0}")]
    NotFound(Uuid),
}

/// Asynchronous CRUD contract against the remote record store.
///
/// Every operation may suspend on the network and fail with a
/// [`StoreError`]. Implementations are expected to honor two contracts the
/// core relies on:
///
/// - `delete_category` cascades: the store removes the category's recipes
///   along with the category record.
/// - `persist_recipe` treats [`RecipeRecord::import_key`] as a stable
///   identity, so persisting the same record twice updates rather than
///   duplicates.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetches every category record.
    async fn fetch_all_categories(&self) -> Result<Vec<Category>, StoreError>;

    /// Creates a category and returns the record with its assigned id.
    async fn create_category(&self, name: &str, icon: &str) -> Result<Category, StoreError>;

    /// Updates the name and icon of an existing category.
    async fn update_category(&self, id: Uuid, name: &str, icon: &str) -> Result<(), StoreError>;

    /// Deletes a category and, by contract, the recipes filed under it.
    async fn delete_category(&self, id: Uuid) -> Result<(), StoreError>;

    /// Persists a recipe under the given category.
    async fn persist_recipe(
        &self,
        category_id: Uuid,
        recipe: &RecipeRecord,
    ) -> Result<(), StoreError>;
}
