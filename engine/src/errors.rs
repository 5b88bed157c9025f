//! # Error Handling Module
//!
//! Defines the error taxonomy shared by every component of the engine. Each
//! variant maps to exactly one HTTP status code; that mapping is consumed by
//! the dispatch layer in the `server` crate, never re-derived there.
//!
//! Database-driver failures are never surfaced to callers verbatim: they pass
//! through [`classify_database_error`], which inspects the dialect-specific
//! message text and reclassifies known conditions (unique violations, missing
//! required columns, connection failures) into the taxonomy below.

use thiserror::Error;

use crate::database::Dialect;

/// The error type produced by every fallible engine operation.
///
/// Display text is safe to log; it is not automatically safe to return to an
/// HTTP client verbatim (see `InternalError`, whose details are redacted at
/// the dispatch boundary unless a development flag is set).
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input: bad filter syntax, a coercion failure, an unknown column type.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A filter value could not be coerced to its column's declared type.
    /// Kept distinct from [`Error::BadRequest`] so the HTTP dispatch layer
    /// can surface `{field, operator, value}` in the error envelope's
    /// `details`, per the documented filter-failure contract.
    #[error("could not coerce filter value: {0}")]
    Filter(FilterError),

    /// Missing or invalid credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Valid credential, insufficient capability.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Collection or record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint violated, or a duplicate collection/column name.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller exceeded a rate limit.
    #[error("too many requests: {0}")]
    TooManyRequests(String),

    /// A schema rule was violated (e.g. a required column is missing).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The connection string does not identify a supported dialect.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A driver-level failure that did not classify into a more specific variant.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The connection pool could not hand out a connection within its wait budget.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A bug was caught by the top-level recovery boundary. Never constructed by
    /// component code directly; reserved for the dispatch-layer panic handler.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Error::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// The HTTP status code this error maps to. Mirrored 1:1 in the `code`
    /// field of the dispatch layer's error envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BadRequest(_) | Error::Validation(_) | Error::Filter(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            Error::TooManyRequests(_) => 429,
            Error::Configuration(_) | Error::Database(_) | Error::Internal(_) => 500,
            Error::ServiceUnavailable(_) => 503,
        }
    }
}

/// A structured description of a filter-coercion failure, per §7: surfaced as
/// `{field, operator, value}` in the response body's `details` object.
#[derive(Debug, Clone)]
pub struct FilterError {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl FilterError {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self { field: field.into(), operator: operator.into(), value: value.into() }
    }

    pub fn into_bad_request(self) -> Error {
        Error::Filter(self)
    }
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "field='{}' operator='{}' value='{}'", self.field, self.operator, self.value)
    }
}

/// Reclassifies a raw `sqlx::Error` using dialect-specific message text.
///
/// This is the single place that understands what each dialect's driver says
/// when a constraint is violated; nothing upstream should pattern-match on
/// `sqlx::Error` directly.
pub fn classify_database_error(err: sqlx::Error, dialect: Dialect) -> Error {
    match err {
        sqlx::Error::PoolTimedOut => Error::ServiceUnavailable("connection pool exhausted".into()),
        sqlx::Error::RowNotFound => Error::NotFound("record not found".into()),
        sqlx::Error::Io(_) => Error::ServiceUnavailable("database connection refused".into()),
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_lowercase();
            let is_unique = match dialect {
                Dialect::Sqlite => message.contains("unique constraint"),
                Dialect::Postgres => message.contains("duplicate key value"),
                Dialect::MySql => message.contains("duplicate entry") || message.contains("1062"),
            };
            if is_unique {
                return Error::Conflict("a record with that value already exists".into());
            }

            let is_not_null_or_fk = message.contains("not null")
                || message.contains("foreign key")
                || message.contains("not-null")
                || message.contains("cannot be null");
            if is_not_null_or_fk {
                return Error::BadRequest("required value missing or references a nonexistent row".into());
            }

            if message.contains("connection refused") || message.contains("could not connect") {
                return Error::ServiceUnavailable("database connection refused".into());
            }

            Error::Database(sqlx::Error::Database(db_err))
        }
        other => Error::Database(other),
    }
}
