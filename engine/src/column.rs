//! # Column Module
//!
//! A single typed, named field within a collection. Columns are declared
//! through the API at runtime (spec §3) rather than derived from a Rust
//! struct, which is the central difference between this engine and a
//! conventional compile-time ORM model.

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::types::ColumnType;

/// The two column names reserved for the implicit, system-owned identifier
/// pair every collection carries.
pub const RESERVED_COLUMN_NAMES: &[&str] = &["id", "rowid"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self { name: name.into(), column_type, nullable: true, unique: false, default_value: None }
    }

    /// Validates the column name. A non-nullable column with no default
    /// simply requires every insert to supply it explicitly; that's
    /// enforced at insert time by [`crate::service::create`], not here.
    pub fn validate(&self) -> Result<(), Error> {
        if !is_valid_identifier(&self.name) {
            return Err(Error::Validation(format!(
                "column name '{}' must match [a-z][a-z0-9_]*",
                self.name
            )));
        }
        if RESERVED_COLUMN_NAMES.contains(&self.name.as_str()) {
            return Err(Error::Validation(format!("column name '{}' is reserved", self.name)));
        }
        Ok(())
    }
}

/// Validates a lowercase identifier per the collection/column naming rule:
/// `[a-z][a-z0-9_]*`.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
