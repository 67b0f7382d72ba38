//! RecipeBox Core Library
//!
//! Category synchronization and package import logic for RecipeBox
//! applications. The presentation layer observes the category cache owned
//! by [`SyncCoordinator`] and drives imports through the [`import`]
//! pipeline; the remote backend is injected behind the [`RecordStore`]
//! trait.

pub mod import;
pub mod models;
pub mod store;
pub mod sync;

pub use import::{
    decode, decode_file, group_by_category, CategoryGroup, ImportExecutor, ImportFailure,
    ImportFailureKind, ImportReport, PackageError, Selection,
};
pub use models::{Category, ExportedRecipe, ImportPreview, RecipeRecord, DEFAULT_ICON};
pub use store::{MemoryStore, RecordStore, StoreError, StoreOp};
pub use sync::SyncCoordinator;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
