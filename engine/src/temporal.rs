//! # Temporal Type Conversion Module
//!
//! Conversion between ISO-8601 wire values and each dialect's native
//! datetime representation. Every dialect ultimately stores `datetime`
//! columns as text or a timestamp type that accepts ISO-8601 input, so the
//! conversion here is about picking the representation each driver prefers,
//! not about timezone semantics (the engine treats everything as UTC).

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::database::Dialect;
use crate::errors::Error;

/// Parses a wire-format ISO-8601 string into a UTC `DateTime`.
///
/// Accepts a bare offset-free `DateTime`, an RFC 3339 string with an offset,
/// and the space-separated `YYYY-MM-DD HH:MM:SS[.ffffff]` form MySQL/SQLite
/// tend to round-trip through.
pub fn parse_datetime_utc(value: &str) -> Result<DateTime<Utc>, Error> {
    if let Ok(dt) = value.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }
    Err(Error::BadRequest(format!("'{value}' is not a valid datetime")))
}

/// Formats a UTC `DateTime` the way `dialect` expects it to be bound.
///
/// SQLite and PostgreSQL both happily accept RFC 3339; MySQL's `DATETIME`
/// column type wants the space-separated form without a `T` or an offset
/// suffix.
pub fn format_datetime_for_dialect(value: &DateTime<Utc>, dialect: Dialect) -> String {
    match dialect {
        Dialect::Postgres | Dialect::Sqlite => value.to_rfc3339(),
        Dialect::MySql => value.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
    }
}

/// Re-renders an arbitrary ISO-8601 wire value into `dialect`'s preferred
/// on-the-wire form, round-tripping through [`parse_datetime_utc`] first so
/// malformed input is rejected before it reaches the driver.
pub fn normalize_for_dialect(value: &str, dialect: Dialect) -> Result<String, Error> {
    let parsed = parse_datetime_utc(value)?;
    Ok(format_datetime_for_dialect(&parsed, dialect))
}
