use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// A recipe as it appears inside an exported package.
///
/// `category_name` is a grouping label, not a foreign key; it only becomes
/// one after resolution during import. Fields beyond the ones the core
/// understands (ingredients, steps, notes, ...) are carried opaquely in
/// `extra` and written back out unmodified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportedRecipe {
    pub name: String,
    #[serde(rename = "categoryName")]
    pub category_name: String,
    /// Total time in minutes.
    #[serde(rename = "recipeTime")]
    pub recipe_time: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExportedRecipe {
    pub fn new(
        name: impl Into<String>,
        category_name: impl Into<String>,
        recipe_time: u32,
    ) -> Self {
        Self {
            name: name.into(),
            category_name: category_name.into(),
            recipe_time,
            extra: Map::new(),
        }
    }

    /// Stable identifier for this recipe across repeated imports.
    ///
    /// A sha256 over the recipe's content, so re-running an import after a
    /// partial failure addresses the same record instead of creating a
    /// duplicate in any store that dedups on it.
    pub fn import_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.category_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.recipe_time.to_be_bytes());
        // Map iteration is insertion-ordered; serialize for a stable byte view.
        if !self.extra.is_empty() {
            let payload = serde_json::to_vec(&self.extra).unwrap_or_default();
            hasher.update(&payload);
        }
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for ExportedRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} min, {})",
            self.name, self.recipe_time, self.category_name
        )
    }
}

/// A recipe handed to the record store for persistence.
///
/// Pairs the exported content with the stable `import_key` the store can
/// use to make re-import idempotent.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRecord {
    pub import_key: String,
    pub name: String,
    pub recipe_time: u32,
    pub payload: Map<String, Value>,
}

impl RecipeRecord {
    pub fn from_exported(recipe: &ExportedRecipe) -> Self {
        Self {
            import_key: recipe.import_key(),
            name: recipe.name.clone(),
            recipe_time: recipe.recipe_time,
            payload: recipe.extra.clone(),
        }
    }
}

/// A decoded package, ready for selection and import.
///
/// Immutable once constructed; recipe order matches the source file.
/// Selection state lives separately (see [`crate::import::Selection`]).
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPreview {
    /// Where the package came from, for display only.
    pub source: String,
    pub recipes: Vec<ExportedRecipe>,
}

impl ImportPreview {
    pub fn new(source: impl Into<String>, recipes: Vec<ExportedRecipe>) -> Self {
        Self {
            source: source.into(),
            recipes,
        }
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
