//! Router construction and the `{name}:{verb}` dispatch this crate's routes
//! are built around. Collections are declared at runtime, so per-collection
//! static routes are never an option; instead every request under the API
//! prefix lands on one of two handlers and is routed by splitting its
//! captured `{resource}` path segment on the last `:`.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use axum::{Extension, Json};
use serde_json::Value;

use cellar_engine::auth::Identity;
use cellar_engine::query_builder::AggregateOp;
use cellar_engine::Error;

use crate::http::query_string::{self, ParsedQuery};
use crate::http::response::{AppError, RequestId};
use crate::http::{apikeys, auth, collections, health, records, users};
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    let resource_router =
        Router::new().route("/{resource}", get(read_dispatch).post(write_dispatch)).with_state(state.clone());

    let app = Router::new()
        .route("/health", get(health::health))
        .nest(&format!("/{}", state.config.api_prefix), resource_router)
        .with_state(state.clone());

    // Layered innermost-first: `resolve_identity` runs closest to the
    // handlers, `CatchPanicLayer` wraps it so a panic there or in a handler
    // never escapes as an unwind, and `request_id` is outermost so its
    // response-header echo still runs on a panic-recovered response instead
    // of being skipped by the unwind.
    app.layer(axum::middleware::from_fn_with_state(state.clone(), crate::http::middleware::resolve_identity))
        .layer(tower_http::catch_panic::CatchPanicLayer::custom(crate::http::response::panic_response))
        .layer(axum::middleware::from_fn(crate::http::middleware::request_id))
}

/// Splits `name:verb` on the last `:`. A segment with no `:` is rejected —
/// every resource URL names a verb explicitly, there is no default.
fn split_resource(resource: &str) -> Result<(&str, &str), Error> {
    let idx = resource.rfind(':').ok_or_else(|| Error::bad_request("resource path must be of the form 'name:verb'"))?;
    Ok((&resource[..idx], &resource[idx + 1..]))
}

async fn read_dispatch(
    State(state): State<SharedState>,
    Path(resource): Path<String>,
    identity: Option<Extension<Identity>>,
    Extension(request_id): Extension<RequestId>,
    uri: axum::http::Uri,
) -> Result<Json<Value>, AppError> {
    let identity = identity.map(|Extension(i)| i);
    let rid = request_id.0;
    let (name, verb) = split_resource(&resource).map_err(|e| AppError::new(e, rid.clone()))?;
    let query = query_string::parse(uri.query());

    read_verb(&state, identity, name, verb, query).await.map(Json).map_err(|e| AppError::new(e, rid))
}

async fn read_verb(state: &SharedState, identity: Option<Identity>, name: &str, verb: &str, query: ParsedQuery) -> Result<Value, Error> {
    match (name, verb) {
        ("users", "list") => users::list(state, identity, query).await,
        ("users", "get") => users::get(state, identity, query).await,
        ("apikeys", "list") => apikeys::list(state, identity, query).await,
        ("apikeys", "get") => apikeys::get(state, identity, query).await,
        ("collections", "list") => collections::list(state, identity, query).await,
        ("collections", "get") => collections::get(state, identity, query).await,
        (collection, "list") => records::list(state, identity, collection, query).await,
        (collection, "get") => records::get(state, identity, collection, query).await,
        (collection, "count") => records::aggregate(state, identity, collection, AggregateOp::Count, query).await,
        (collection, "sum") => records::aggregate(state, identity, collection, AggregateOp::Sum, query).await,
        (collection, "avg") => records::aggregate(state, identity, collection, AggregateOp::Avg, query).await,
        (collection, "min") => records::aggregate(state, identity, collection, AggregateOp::Min, query).await,
        (collection, "max") => records::aggregate(state, identity, collection, AggregateOp::Max, query).await,
        (_, other) => Err(Error::bad_request(format!("unsupported verb '{other}' for GET"))),
    }
}

async fn write_dispatch(
    State(state): State<SharedState>,
    Path(resource): Path<String>,
    identity: Option<Extension<Identity>>,
    Extension(request_id): Extension<RequestId>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, AppError> {
    let identity = identity.map(|Extension(i)| i);
    let rid = request_id.0;
    let (name, verb) = split_resource(&resource).map_err(|e| AppError::new(e, rid.clone()))?;
    let body = body.map(|Json(v)| v).unwrap_or(Value::Null);

    write_verb(&state, identity, name, verb, body).await.map(Json).map_err(|e| AppError::new(e, rid))
}

/// `create`/`insert` and `destroy`/`delete` are documented aliases of one
/// another (spec §4.7) — normalized here so every handler below only ever
/// sees the canonical verb.
fn normalize_verb(verb: &str) -> &str {
    match verb {
        "insert" => "create",
        "delete" => "destroy",
        other => other,
    }
}

async fn write_verb(state: &SharedState, identity: Option<Identity>, name: &str, verb: &str, body: Value) -> Result<Value, Error> {
    let verb = normalize_verb(verb);
    match (name, verb) {
        ("auth", "login") => auth::login(state, body).await,
        ("auth", "refresh") => auth::refresh(state, identity).await,
        ("users", "create") => users::create(state, identity, body).await,
        ("users", "update") => users::update(state, identity, body).await,
        ("users", "destroy") => users::destroy(state, identity, body).await,
        ("apikeys", "create") => apikeys::create(state, identity, body).await,
        ("apikeys", "update") => apikeys::update(state, identity, body).await,
        ("apikeys", "destroy") => apikeys::destroy(state, identity, body).await,
        ("collections", "create") => collections::create(state, identity, body).await,
        ("collections", "update") => collections::update(state, identity, body).await,
        ("collections", "destroy") => collections::destroy(state, identity, body).await,
        (collection, "create") => records::create(state, identity, collection, body).await,
        (collection, "update") => records::update(state, identity, collection, body).await,
        (collection, "destroy") => records::destroy(state, identity, collection, body).await,
        (_, other) => Err(Error::bad_request(format!("unsupported verb '{other}' for POST"))),
    }
}
