//! CRUD and aggregation operations against a user-defined collection.
//! Verb dispatch mirrors spec §4.7's dispatch table; every operation
//! requires a resolved identity, and every mutating one additionally
//! requires write capability.

use serde_json::{Map, Value};

use cellar_engine::auth::Identity;
use cellar_engine::query_builder::AggregateOp;
use cellar_engine::{parse_filters, service, CollectionDef, Error};

use crate::http::authz::{require_identity, require_write};
use crate::http::query_string::ParsedQuery;
use crate::http::schema::envelope;
use crate::state::SharedState;

fn collection(state: &SharedState, name: &str) -> Result<CollectionDef, Error> {
    state.registry.get(name).ok_or_else(|| Error::not_found(format!("collection '{name}' not found")))
}

pub async fn list(state: &SharedState, identity: Option<Identity>, name: &str, query: ParsedQuery) -> Result<Value, Error> {
    require_identity(identity)?;
    let def = collection(state, name)?;
    let filters = parse_filters(&query.filter_params, &def, state.db.dialect())?;
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

    let body = serde_json::json!({
        "data": result.data,
        "next_cursor": result.next_cursor,
        "total": result.total,
    });
    Ok(envelope(query.schema, body, &def))
}

pub async fn get(state: &SharedState, identity: Option<Identity>, name: &str, query: ParsedQuery) -> Result<Value, Error> {
    require_identity(identity)?;
    let def = collection(state, name)?;
    let id = query.id.ok_or_else(|| Error::bad_request("'id' query parameter is required"))?;
    let record = service::get(&state.db, &def, &id)
        .await?
        .ok_or_else(|| Error::not_found(format!("record '{id}' not found")))?;
    Ok(envelope(query.schema, serde_json::json!({ "data": record }), &def))
}

pub async fn create(state: &SharedState, identity: Option<Identity>, name: &str, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_write(&identity)?;
    let def = collection(state, name)?;
    let payload = extract_data(&body)?;
    let record = service::create(&state.db, &def, &payload).await?;
    Ok(serde_json::json!({ "data": record }))
}

pub async fn update(state: &SharedState, identity: Option<Identity>, name: &str, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_write(&identity)?;
    let def = collection(state, name)?;
    let id = extract_id(&body)?;
    let payload = extract_data(&body)?;
    let record = service::update(&state.db, &def, &id, &payload).await?;
    Ok(serde_json::json!({ "data": record }))
}

pub async fn destroy(state: &SharedState, identity: Option<Identity>, name: &str, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_write(&identity)?;
    let def = collection(state, name)?;
    let id = extract_id(&body)?;
    service::destroy(&state.db, &def, &id).await?;
    Ok(serde_json::json!({ "deleted": true }))
}

pub async fn aggregate(
    state: &SharedState,
    identity: Option<Identity>,
    name: &str,
    op: AggregateOp,
    query: ParsedQuery,
) -> Result<Value, Error> {
    require_identity(identity)?;
    let def = collection(state, name)?;
    let filters = parse_filters(&query.filter_params, &def, state.db.dialect())?;
    service::aggregate(&state.db, &def, op, query.field.as_deref(), &filters).await
}

fn extract_data(body: &Value) -> Result<Map<String, Value>, Error> {
    body.get("data")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| Error::bad_request("request body must include a 'data' object"))
}

fn extract_id(body: &Value) -> Result<String, Error> {
    body.get("id")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| Error::bad_request("request body must include an 'id' string"))
}
