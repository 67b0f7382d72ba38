//! Import execution: committing a confirmed selection into the store.
//!
//! The executor never touches the category cache itself. New categories are
//! created through the [`SyncCoordinator`], preserving the single-writer
//! discipline over the cache; recipe records go straight to the store.
//!
//! Import is additive: nothing already persisted is rolled back when a
//! later step fails. Retrying the same selection after fixing the failure
//! cause is safe because each recipe carries a stable import key the store
//! dedups on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::planner::Selection;
use crate::models::{ImportPreview, RecipeRecord, DEFAULT_ICON};
use crate::store::{RecordStore, StoreError};
use crate::sync::SyncCoordinator;

/// Why a single recipe failed to import.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportFailureKind {
    /// The category this recipe depends on could not be created; the
    /// recipe cannot be filed anywhere.
    #[error("Category creation failed: {0}")]
    CategoryCreateFailed(StoreError),

    /// The recipe itself failed to persist.
    #[error("Recipe persistence failed: {0}")]
    Persist(StoreError),
}

/// One failed recipe out of an import run.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    /// Index of the recipe in the package.
    pub index: usize,
    pub recipe_name: String,
    pub kind: ImportFailureKind,
}

/// Outcome of an import run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Recipes successfully persisted.
    pub imported: usize,
    /// Categories created for names that had no existing match.
    pub categories_created: usize,
    /// Per-recipe failures, in selection order.
    pub failures: Vec<ImportFailure>,
    /// True if the run was cancelled before finishing; recipes persisted
    /// up to that point stay committed.
    pub cancelled: bool,
}

impl ImportReport {
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Commits confirmed selections through the coordinator and store.
pub struct ImportExecutor<S> {
    coordinator: Arc<SyncCoordinator<S>>,
    cancelled: AtomicBool,
}

impl<S: RecordStore> ImportExecutor<S> {
    pub fn new(coordinator: Arc<SyncCoordinator<S>>) -> Self {
        Self {
            coordinator,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Requests cancellation of the run in progress.
    ///
    /// Takes effect between recipe-persist steps; the step in flight
    /// completes and stays committed.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Imports the selected recipes from the package.
    ///
    /// Category names resolve through the coordinator's cache by exact
    /// match; unresolved names get one new category per distinct name
    /// for the whole run, created through the coordinator. A failed
    /// category creation fails every selected recipe depending on that
    /// name; a failed recipe persist fails only that recipe. An empty
    /// selection returns an empty report without touching anything.
    pub async fn import_selected(
        &self,
        preview: &ImportPreview,
        selection: &Selection,
    ) -> ImportReport {
        self.cancelled.store(false, Ordering::SeqCst);

        let mut report = ImportReport::default();
        if selection.is_empty() {
            return report;
        }

        info!(
            source = %preview.source,
            selected = selection.len(),
            "starting recipe import"
        );

        // Resolution memo for this run: every category name resolves at
        // most once, whether to an existing cached id, a freshly created
        // one, or the error that creation produced.
        let mut resolved: HashMap<String, Result<Uuid, StoreError>> = HashMap::new();

        for index in selection.iter() {
            if self.cancelled.load(Ordering::SeqCst) {
                debug!("import cancelled, leaving remaining recipes untouched");
                report.cancelled = true;
                break;
            }

            let Some(recipe) = preview.recipes.get(index) else {
                // Selection built against a different preview; nothing
                // sensible to import for this index.
                debug!(index, "selected index out of range, skipping");
                continue;
            };

            let category_id = match resolved.get(&recipe.category_name) {
                Some(entry) => entry.clone(),
                None => {
                    let entry = match self.coordinator.find_by_name(&recipe.category_name).await {
                        Some(category) => Ok(category.id),
                        None => {
                            match self
                                .coordinator
                                .create_category(&recipe.category_name, DEFAULT_ICON)
                                .await
                            {
                                Ok(category) => {
                                    report.categories_created += 1;
                                    Ok(category.id)
                                }
                                Err(e) => Err(e),
                            }
                        }
                    };
                    resolved.insert(recipe.category_name.clone(), entry.clone());
                    entry
                }
            };

            match category_id {
                Err(e) => report.failures.push(ImportFailure {
                    index,
                    recipe_name: recipe.name.clone(),
                    kind: ImportFailureKind::CategoryCreateFailed(e),
                }),
                Ok(id) => {
                    let record = RecipeRecord::from_exported(recipe);
                    match self.coordinator.store().persist_recipe(id, &record).await {
                        Ok(()) => report.imported += 1,
                        Err(e) => report.failures.push(ImportFailure {
                            index,
                            recipe_name: recipe.name.clone(),
                            kind: ImportFailureKind::Persist(e),
                        }),
                    }
                }
            }
        }

        info!(
            imported = report.imported,
            created = report.categories_created,
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "recipe import finished"
        );
        report
    }
}
