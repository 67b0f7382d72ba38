//! Recipe package decoding.
//!
//! Turns the raw bytes of an exported recipe package into an
//! [`ImportPreview`]. Packages are JSON with an optional version marker:
//!
//! ```json
//! {
//!   "version": 1,
//!   "recipes": [
//!     { "name": "Pho", "categoryName": "Soup", "recipeTime": 120, "...": "..." }
//!   ]
//! }
//! ```
//!
//! Recipe order in the preview matches the order in the file. Fields the
//! core does not understand ride along opaquely on each recipe.

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{ExportedRecipe, ImportPreview};

/// The package schema version this decoder understands.
pub const SUPPORTED_VERSION: u64 = 1;

/// Errors that can occur while decoding a package.
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Malformed package: {0}")]
    Malformed(String),

    #[error("Unsupported package version {0} (supported: {SUPPORTED_VERSION})")]
    UnsupportedVersion(u64),

    #[error("Failed to read package '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Deserialize)]
struct PackageFile {
    recipes: Vec<ExportedRecipe>,
}

/// Decodes package bytes into an [`ImportPreview`].
///
/// `source` is a display-only locator (file name, URL) carried on the
/// preview; it does not affect decoding.
pub fn decode(bytes: &[u8], source: impl Into<String>) -> Result<ImportPreview, PackageError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| PackageError::Malformed(e.to_string()))?;

    // Gate on the version marker before interpreting the rest, so a newer
    // package with a changed recipe schema reports UnsupportedVersion
    // rather than Malformed.
    if let Some(version) = value.get("version") {
        match version.as_u64() {
            Some(v) if v == SUPPORTED_VERSION => {}
            Some(v) => return Err(PackageError::UnsupportedVersion(v)),
            None => {
                return Err(PackageError::Malformed(
                    "version marker is not an unsigned integer".to_string(),
                ))
            }
        }
    }

    let package: PackageFile =
        serde_json::from_value(value).map_err(|e| PackageError::Malformed(e.to_string()))?;

    for (index, recipe) in package.recipes.iter().enumerate() {
        if recipe.name.trim().is_empty() {
            return Err(PackageError::Malformed(format!(
                "recipe at index {} has an empty name",
                index
            )));
        }
    }

    Ok(ImportPreview::new(source, package.recipes))
}

/// Reads and decodes a package file; the preview's source is the path.
pub fn decode_file(path: &Path) -> Result<ImportPreview, PackageError> {
    let bytes = std::fs::read(path).map_err(|e| PackageError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    decode(&bytes, path.display().to_string())
}
