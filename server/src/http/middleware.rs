//! Request-scoped middleware: request-id propagation and credential
//! resolution. Panic recovery is `tower_http::catch_panic::CatchPanicLayer`,
//! wired in `dispatch.rs` between the two — inside `request_id` so its
//! header echo still runs on a recovered panic, outside `resolve_identity`
//! so a panic there can't escape as an unwind — the one piece of this
//! pipeline where hand-rolling async-safe `catch_unwind` would just be a
//! worse version of an existing, widely used crate.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use ulid::Ulid;

use cellar_engine::auth::Identity;

use crate::http::response::RequestId;
use crate::state::SharedState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reads `X-Request-ID` from the incoming request, or mints a fresh ULID,
/// attaches it to request extensions for handlers to read, and echoes it
/// on the response.
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Ulid::new().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Resolves the caller's credential, if any, into an [`Identity`] and
/// attaches it to request extensions. Does not itself reject a missing or
/// invalid credential — `/health` and `auth:login`/`auth:refresh` share this
/// same pipeline with every authenticated route; handlers that require an
/// identity call [`crate::http::authz::require_identity`] and reject for
/// themselves.
pub async fn resolve_identity(State(state): State<SharedState>, mut req: Request<Body>, next: Next) -> Response {
    if let Some(identity) = extract_identity(&state, &req).await {
        req.extensions_mut().insert(identity);
    }
    next.run(req).await
}

/// `Authorization: Bearer <value>` is a single, content-sniffed credential:
/// tried as a JWT first, and on verification failure tried as an API key
/// secret before being given up on. The separately configured API-key
/// header is a second, independent fallback for callers that don't use
/// `Authorization` at all.
async fn extract_identity(state: &SharedState, req: &Request<Body>) -> Option<Identity> {
    if let Some(bearer) = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        if let Ok(claims) = state.tokens.verify(bearer) {
            return Some(Identity::PasswordUser {
                id: claims.sub,
                username: String::new(),
                role: claims.role,
                can_write: claims.can_write,
            });
        }
        if let Some(identity) = crate::http::apikeys::resolve_api_key(state, bearer).await {
            return Some(identity);
        }
    }

    if state.config.api_key.enabled {
        let header_name = state.config.api_key.header_name.as_str();
        if let Some(secret) = req.headers().get(header_name).and_then(|v| v.to_str().ok()) {
            return crate::http::apikeys::resolve_api_key(state, secret).await;
        }
    }

    None
}
