//! # Value Binding Module
//!
//! Implements the tagged-variant `ScannedValue` the redesign notes call for:
//! every value that crosses from wire-format string into SQL carries its
//! declared logical type from the moment it is coerced, and is only turned
//! into driver bytes at the outermost edge (here). This is also what fixes
//! the historical aggregation-filter bug — coercion and binding happen
//! through this single path for every caller (list, get, count, sum, avg,
//! min, max), so a numeric filter can never reach the driver as a bare
//! string.
//!
//! Decimal values are the one type that never actually becomes a native
//! numeric SQL value: per the data model invariant, decimals cross the
//! boundary as strings on both read and write, so their `ScannedValue`
//! variant stays textual all the way down.

use sqlx::any::AnyArguments;
use sqlx::Arguments;

use crate::database::Dialect;
use crate::errors::Error;
use crate::temporal;
use crate::types::ColumnType;

/// A value that has already been coerced to its column's logical type.
///
/// Produced by [`coerce`] from a raw wire-format string (URL query value or
/// JSON scalar rendered to a string), consumed by [`bind`] when the query
/// builder emits the final statement.
#[derive(Debug, Clone)]
pub enum ScannedValue {
    String(String),
    Integer(i64),
    Float(f64),
    Decimal(String),
    Boolean(bool),
    Datetime(String),
    Json(String),
    Null,
}

/// Coerces a raw string value to its column's declared logical type.
///
/// This is the single coercion entry point shared by insert/update payload
/// binding and by the filter parser — the same function backs both a
/// `POST orders:create` body value and a `?total[gt]=150` filter value.
pub fn coerce(raw: &str, column_type: ColumnType, dialect: Dialect) -> Result<ScannedValue, Error> {
    match column_type {
        ColumnType::String | ColumnType::Text => Ok(ScannedValue::String(raw.to_string())),

        ColumnType::Integer => raw
            .parse::<i64>()
            .map(ScannedValue::Integer)
            .map_err(|_| Error::BadRequest(format!("'{raw}' is not a valid integer"))),

        ColumnType::Float => raw
            .parse::<f64>()
            .map(ScannedValue::Float)
            .map_err(|_| Error::BadRequest(format!("'{raw}' is not a valid float"))),

        ColumnType::Decimal => {
            // Validated for shape but never parsed to a float — decimals are
            // textual at every boundary.
            raw.parse::<f64>().map_err(|_| Error::BadRequest(format!("'{raw}' is not a valid decimal")))?;
            Ok(ScannedValue::Decimal(raw.to_string()))
        }

        ColumnType::Boolean => match raw {
            "true" | "1" => Ok(ScannedValue::Boolean(true)),
            "false" | "0" => Ok(ScannedValue::Boolean(false)),
            _ => Err(Error::BadRequest(format!("'{raw}' is not a valid boolean"))),
        },

        ColumnType::Datetime => {
            let normalized = temporal::normalize_for_dialect(raw, dialect)?;
            Ok(ScannedValue::Datetime(normalized))
        }

        ColumnType::Json => Ok(ScannedValue::Json(raw.to_string())),
    }
}

/// Binds a previously-coerced value into a query's argument list, in the
/// representation `dialect` expects on the wire.
pub fn bind(args: &mut AnyArguments<'_>, value: &ScannedValue, dialect: Dialect) {
    match value {
        ScannedValue::String(s) | ScannedValue::Decimal(s) | ScannedValue::Datetime(s) | ScannedValue::Json(s) => {
            let _ = args.add(s.clone());
        }
        ScannedValue::Integer(i) => {
            let _ = args.add(*i);
        }
        ScannedValue::Float(f) => {
            let _ = args.add(*f);
        }
        ScannedValue::Boolean(b) => match dialect {
            // SQLite's `Any` driver binds booleans through INTEGER storage.
            Dialect::Sqlite => {
                let _ = args.add(if *b { 1_i64 } else { 0_i64 });
            }
            Dialect::Postgres | Dialect::MySql => {
                let _ = args.add(*b);
            }
        },
        ScannedValue::Null => {
            let _ = args.add(Option::<String>::None);
        }
    }
}

/// Coerces a JSON scalar (as received in a record create/update payload) to
/// its column's declared logical type, the JSON-body counterpart to
/// [`coerce`]'s query-string path. `null` always yields [`ScannedValue::Null`]
/// regardless of declared type; the caller is responsible for rejecting a
/// null against a non-nullable column before it reaches here.
pub fn coerce_json(value: &serde_json::Value, column_type: ColumnType, dialect: Dialect) -> Result<ScannedValue, Error> {
    if value.is_null() {
        return Ok(ScannedValue::Null);
    }
    match column_type {
        ColumnType::Json => Ok(ScannedValue::Json(value.to_string())),
        _ => {
            let raw = match value {
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            coerce(&raw, column_type, dialect)
        }
    }
}

/// Renders a `ScannedValue` back to its wire-format string (for echoing a
/// server-assigned default, or for the filter serializer's round-trip law).
pub fn to_wire_string(value: &ScannedValue) -> String {
    match value {
        ScannedValue::String(s) | ScannedValue::Decimal(s) | ScannedValue::Datetime(s) | ScannedValue::Json(s) => {
            s.clone()
        }
        ScannedValue::Integer(i) => i.to_string(),
        ScannedValue::Float(f) => f.to_string(),
        ScannedValue::Boolean(b) => b.to_string(),
        ScannedValue::Null => String::new(),
    }
}
