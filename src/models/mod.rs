mod category;
mod recipe;

pub use category::{Category, DEFAULT_ICON};
pub use recipe::{ExportedRecipe, ImportPreview, RecipeRecord};
