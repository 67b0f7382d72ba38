//! Import planning: grouping by category and selection tracking.
//!
//! Grouping keys on the raw `categoryName` string from each recipe, with no
//! normalization: two differently cased names form two groups, matching the
//! exact-match resolution the executor applies later.

use std::collections::{BTreeSet, HashMap};

use crate::models::{ExportedRecipe, ImportPreview};

/// One category's worth of recipes from a package, in file order.
#[derive(Debug, PartialEq)]
pub struct CategoryGroup<'a> {
    /// Raw category name as it appears in the package.
    pub name: &'a str,
    /// Recipes in this group, each with its original index into the package.
    pub recipes: Vec<(usize, &'a ExportedRecipe)>,
}

/// Groups a package's recipes by category name.
///
/// Groups are ordered by first appearance in the package; within each group
/// recipes keep their file order. Every recipe lands in exactly one group.
pub fn group_by_category(preview: &ImportPreview) -> Vec<CategoryGroup<'_>> {
    let mut groups: Vec<CategoryGroup<'_>> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for (index, recipe) in preview.recipes.iter().enumerate() {
        let name = recipe.category_name.as_str();
        let position = *positions.entry(name).or_insert_with(|| {
            groups.push(CategoryGroup {
                name,
                recipes: Vec::new(),
            });
            groups.len() - 1
        });
        groups[position].recipes.push((index, recipe));
    }

    groups
}

/// The set of package indices marked for import.
///
/// Indices are always valid for the preview the selection was built
/// against; an empty selection disables the import action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: BTreeSet<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects every recipe in the preview.
    pub fn select_all(preview: &ImportPreview) -> Self {
        Self {
            indices: (0..preview.len()).collect(),
        }
    }

    /// Deselects everything.
    pub fn clear(&mut self) {
        self.indices.clear();
    }

    /// Flips the selection state of one recipe.
    ///
    /// Out-of-range indices are ignored, keeping the validity invariant.
    pub fn toggle(&mut self, index: usize, preview: &ImportPreview) {
        if index >= preview.len() {
            return;
        }
        if !self.indices.remove(&index) {
            self.indices.insert(index);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// `(selected, total)` counts for display.
    pub fn summary(&self, preview: &ImportPreview) -> (usize, usize) {
        (self.indices.len(), preview.len())
    }

    /// Selected indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}
