//! # Portable Column Types
//!
//! The eight logical column types a collection can declare, and the table
//! that maps each to its native SQL type per dialect (spec §4.2). Every
//! other component — the query builder, the value binder, the filter
//! parser — keys off this enum rather than raw SQL type strings, so a new
//! dialect only has to extend [`ColumnType::sql_type`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::database::Dialect;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    Datetime,
    Json,
}

impl ColumnType {
    pub fn all() -> &'static [ColumnType] {
        &[
            ColumnType::String,
            ColumnType::Text,
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Decimal,
            ColumnType::Boolean,
            ColumnType::Datetime,
            ColumnType::Json,
        ]
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "string" => ColumnType::String,
            "text" => ColumnType::Text,
            "integer" => ColumnType::Integer,
            "float" => ColumnType::Float,
            "decimal" => ColumnType::Decimal,
            "boolean" => ColumnType::Boolean,
            "datetime" => ColumnType::Datetime,
            "json" => ColumnType::Json,
            _ => return None,
        })
    }

    /// The native SQL type for this logical type under `dialect`, per the
    /// portable → dialect type mapping table.
    pub fn sql_type(&self, dialect: Dialect) -> &'static str {
        use ColumnType::*;
        use Dialect::*;
        match (self, dialect) {
            (String, Sqlite) => "TEXT",
            (String, Postgres) => "VARCHAR(255)",
            (String, MySql) => "VARCHAR(255)",

            (Text, Sqlite) => "TEXT",
            (Text, Postgres) => "TEXT",
            (Text, MySql) => "TEXT",

            (Integer, Sqlite) => "INTEGER",
            (Integer, Postgres) => "INTEGER",
            (Integer, MySql) => "INT",

            (Float, Sqlite) => "REAL",
            (Float, Postgres) => "DOUBLE PRECISION",
            (Float, MySql) => "DOUBLE",

            (Decimal, Sqlite) => "TEXT",
            (Decimal, Postgres) => "NUMERIC(38,10)",
            (Decimal, MySql) => "DECIMAL(38,10)",

            (Boolean, Sqlite) => "INTEGER",
            (Boolean, Postgres) => "BOOLEAN",
            (Boolean, MySql) => "TINYINT(1)",

            (Datetime, Sqlite) => "TEXT",
            (Datetime, Postgres) => "TIMESTAMP",
            (Datetime, MySql) => "DATETIME",

            (Json, Sqlite) => "TEXT",
            (Json, Postgres) => "JSONB",
            (Json, MySql) => "JSON",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float | ColumnType::Decimal)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Decimal => "decimal",
            ColumnType::Boolean => "boolean",
            ColumnType::Datetime => "datetime",
            ColumnType::Json => "json",
        };
        write!(f, "{s}")
    }
}
