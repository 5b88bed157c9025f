//! `GET /health`. Deliberately dependency-free: it never touches the
//! database, so it stays truthful even when the connection pool is
//! exhausted — "down" is reserved for a future liveness signal this crate
//! doesn't yet compute, per spec §6 (`{status: "live"|"down", ...}`).

use axum::response::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "live",
        "name": "cellar",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
