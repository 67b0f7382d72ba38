//! Selective recipe-package import.
//!
//! The pipeline runs in three stages:
//! 1. [`decoder`] parses package bytes into an [`crate::models::ImportPreview`].
//! 2. [`planner`] groups the preview by category and tracks the user's
//!    [`Selection`].
//! 3. [`ImportExecutor`] commits a confirmed selection: categories resolve
//!    or get created through the sync coordinator, recipes persist to the
//!    store, and failures come back itemized in the [`ImportReport`].

pub mod decoder;
pub mod executor;
pub mod planner;

pub use decoder::{decode, decode_file, PackageError, SUPPORTED_VERSION};
pub use executor::{ImportExecutor, ImportFailure, ImportFailureKind, ImportReport};
pub use planner::{group_by_category, CategoryGroup, Selection};
