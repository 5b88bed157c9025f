//! `users:{create,update,destroy,list,get}` — admin-only identity
//! management. Backed by `service::*` against the `users` system
//! collection, the same marshalling code every user-defined collection
//! uses; the only special handling here is password hashing, which never
//! belongs in a generic record payload path.

use serde_json::{Map, Value};

use cellar_engine::auth::{hash_password, Identity};
use cellar_engine::{bootstrap, service, Error};

use crate::http::authz::{require_admin, require_identity};
use crate::http::query_string::ParsedQuery;
use crate::state::SharedState;

fn redact(mut record: Value) -> Value {
    if let Value::Object(map) = &mut record {
        map.remove("password_hash");
    }
    record
}

pub async fn list(state: &SharedState, identity: Option<Identity>, query: ParsedQuery) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let def = bootstrap::users_collection_def();
    let filters = cellar_engine::parse_filters(&query.filter_params, &def, state.db.dialect())?;
    let result = service::list(
        &state.db,
        &def,
        service::ListQuery {
            limit: query.limit.unwrap_or(20),
            after: query.after.clone(),
            order: query.order.clone(),
            fields: query.fields.clone(),
            filters,
            want_total: query.want_total,
        },
    )
    .await?;
    let data: Vec<Value> = result.data.into_iter().map(redact).collect();
    let body = serde_json::json!({ "data": data, "next_cursor": result.next_cursor, "total": result.total });
    Ok(crate::http::schema::envelope(query.schema, body, &def))
}

pub async fn get(state: &SharedState, identity: Option<Identity>, query: ParsedQuery) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let def = bootstrap::users_collection_def();
    let id = query.id.ok_or_else(|| Error::bad_request("'id' query parameter is required"))?;
    let record = service::get(&state.db, &def, &id).await?.ok_or_else(|| Error::not_found(format!("user '{id}' not found")))?;
    Ok(crate::http::schema::envelope(query.schema, serde_json::json!({ "data": redact(record) }), &def))
}

pub async fn create(state: &SharedState, identity: Option<Identity>, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let def = bootstrap::users_collection_def();

    let data = body
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::bad_request("request body must include a 'data' object"))?;

    let password = data
        .get("password")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::bad_request("'password' is required"))?;
    let hash = hash_password(password)?;

    let mut payload: Map<String, Value> = data.clone();
    payload.remove("password");
    payload.insert("password_hash".to_string(), Value::String(hash));

    let record = service::create(&state.db, &def, &payload).await?;
    Ok(serde_json::json!({ "data": redact(record) }))
}

pub async fn update(state: &SharedState, identity: Option<Identity>, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let def = bootstrap::users_collection_def();

    let id = body.get("id").and_then(Value::as_str).ok_or_else(|| Error::bad_request("'id' is required"))?;
    let mut payload = body
        .get("data")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| Error::bad_request("request body must include a 'data' object"))?;

    if let Some(password) = payload.remove("password").and_then(|v| v.as_str().map(str::to_string)) {
        payload.insert("password_hash".to_string(), Value::String(hash_password(&password)?));
    }

    let record = service::update(&state.db, &def, id, &payload).await?;
    Ok(serde_json::json!({ "data": redact(record) }))
}

pub async fn destroy(state: &SharedState, identity: Option<Identity>, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let def = bootstrap::users_collection_def();
    let id = body.get("id").and_then(Value::as_str).ok_or_else(|| Error::bad_request("'id' is required"))?;
    service::destroy(&state.db, &def, id).await?;
    Ok(serde_json::json!({ "deleted": true }))
}
