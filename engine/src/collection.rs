//! # Collection Module
//!
//! A collection is a named logical table. This module owns the definition
//! struct, the naming rules shared by the registry and reconciler, and the
//! implicit system columns every backing table carries in addition to its
//! declared ones.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::column::{is_valid_identifier, Column};
use crate::errors::Error;

/// System resources that can never be redefined as a user collection.
pub const RESERVED_COLLECTION_NAMES: &[&str] = &["users", "apikeys", "collections", "auth"];

/// Dialect-reserved words rejected as collection or column names regardless
/// of which dialect is actually in use, so a collection created against
/// SQLite does not silently become uncreatable after a later migration to
/// PostgreSQL.
pub const DIALECT_RESERVED_WORDS: &[&str] =
    &["select", "insert", "update", "delete", "table", "where", "order", "group", "index", "primary", "key", "user"];

/// The externally visible identifier column: a 26-character, lexicographically
/// sortable ULID, always present, always unique, always non-null.
pub const ID_COLUMN: &str = "id";

/// The internal auto-increment integer column. Never exposed to API
/// consumers; exists so the physical table has a cheap, dialect-native
/// primary key to order and paginate by underneath the opaque `id`.
pub const ROWID_COLUMN: &str = "rowid";

/// Generates a new externally visible record identifier.
pub fn new_record_id() -> String {
    Ulid::new().to_string()
}

/// A named logical table and its declared columns, in creation order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionDef {
    pub name: String,
    pub columns: Vec<Column>,
}

impl CollectionDef {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self { name: name.into(), columns }
    }

    /// Normalizes and validates a candidate collection name: lowercased and
    /// trimmed, matching `[a-z][a-z0-9_]*`, not a system resource or
    /// dialect-reserved word.
    pub fn normalize_name(raw: &str) -> Result<String, Error> {
        let name = raw.trim().to_lowercase();
        if !is_valid_identifier(&name) {
            return Err(Error::Validation(format!("collection name '{name}' must match [a-z][a-z0-9_]*")));
        }
        if RESERVED_COLLECTION_NAMES.contains(&name.as_str()) {
            return Err(Error::Validation(format!("'{name}' is a reserved system resource name")));
        }
        if DIALECT_RESERVED_WORDS.contains(&name.as_str()) {
            return Err(Error::Validation(format!("'{name}' is a reserved SQL keyword")));
        }
        Ok(name)
    }

    /// Validates the full definition: non-empty column list, no duplicate
    /// column names, no column named `id`/`rowid`.
    pub fn validate(&self) -> Result<(), Error> {
        if self.columns.is_empty() {
            return Err(Error::Validation("a collection must declare at least one column".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for col in &self.columns {
            col.validate()?;
            if !seen.insert(col.name.clone()) {
                return Err(Error::Validation(format!("duplicate column name '{}'", col.name)));
            }
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}
