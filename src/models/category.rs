use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default icon assigned to categories created during import.
pub const DEFAULT_ICON: &str = "folder";

/// A recipe category as stored in the record store.
///
/// The `id` is assigned by the store on creation and stays stable across
/// sync. The `icon` is an opaque glyph name interpreted by the presentation
/// layer; the core never inspects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Creates a category with a locally generated id.
    ///
    /// Intended for store implementations assembling the record they
    /// return from a create call; the coordinator never builds one itself.
    pub fn new(name: impl Into<String>, icon: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            icon: icon.into(),
            created_at: now,
            updated_at: now,
        }
    }

}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.icon)
    }
}
