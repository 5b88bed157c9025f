//! The response envelope: every success response uses its natural shape,
//! every error response uses the documented `{error, code, details,
//! request_id}` shape. Mapping from the engine's typed [`cellar_engine::Error`]
//! to an HTTP status happens only here, at the dispatch boundary — nowhere
//! upstream re-derives it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cellar_engine::Error as EngineError;
use serde_json::json;

#[derive(Clone)]
pub struct RequestId(pub String);

/// Wraps an engine error together with the request id it failed under, so
/// the error envelope can always carry a correlation id even though the
/// engine itself has no notion of one.
pub struct AppError {
    pub error: EngineError,
    pub request_id: String,
}

impl AppError {
    pub fn new(error: EngineError, request_id: impl Into<String>) -> Self {
        Self { error, request_id: request_id.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let details = match &self.error {
            EngineError::Filter(fe) => Some(json!({ "field": fe.field, "operator": fe.operator, "value": fe.value })),
            _ => None,
        };

        // Internal-error detail is redacted from the body but always logged
        // with full context, since the response the client sees can never
        // carry it.
        let message = match &self.error {
            EngineError::Internal(_) => {
                log::error!("internal error [request_id={}]: {}", self.request_id, self.error);
                "internal error".to_string()
            }
            EngineError::Database(_) => {
                log::error!("database error [request_id={}]: {}", self.request_id, self.error);
                "database error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "error": message,
            "code": status.as_u16(),
            "details": details,
            "request_id": self.request_id,
        });

        (status, Json(body)).into_response()
    }
}

/// Wired as `CatchPanicLayer`'s custom handler so a caught panic still comes
/// back as the documented `{error, code, details, request_id}` envelope
/// instead of `tower-http`'s default plain-text body. The panic hook only
/// receives the panic payload, not the request, so `request_id` is `null`
/// here; the surrounding `request_id` middleware (layered outside this one)
/// still echoes `X-Request-ID` on the response regardless.
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned());

    if let Some(detail) = &detail {
        log::error!("panic recovered: {detail}");
    } else {
        log::error!("panic recovered: <non-string payload>");
    }

    let body = json!({
        "error": "internal error",
        "code": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        "details": Option::<String>::None,
        "request_id": Option::<String>::None,
    });

    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
