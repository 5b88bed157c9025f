//! `apikeys:{create,update,destroy,list,get}` — admin-only API-key
//! management, plus [`resolve_api_key`], the lookup the auth middleware
//! uses to turn a presented secret into an [`Identity`]. The secret is
//! shown to the client exactly once, at creation or rotation; every other
//! response redacts the stored digest.

use serde_json::{Map, Value};

use cellar_engine::auth::{generate_api_key, verify_api_key, Identity, Role};
use cellar_engine::{bootstrap, service, Error};

use crate::http::authz::{require_admin, require_identity};
use crate::http::query_string::ParsedQuery;
use crate::state::SharedState;

fn redact(mut record: Value) -> Value {
    if let Value::Object(map) = &mut record {
        map.remove("hash");
    }
    record
}

/// Looks an API key up by its lookup prefix, verifies the presented secret
/// in constant time, and — on success — stamps `last_used_at`. Used
/// exclusively by the auth middleware; never exposed over HTTP.
pub async fn resolve_api_key(state: &SharedState, secret: &str) -> Option<Identity> {
    let prefix = cellar_engine::auth::apikey::lookup_prefix(secret)?;
    let def = bootstrap::apikeys_collection_def();
    let condition = cellar_engine::Condition {
        field: "prefix".to_string(),
        operator: cellar_engine::Operator::Eq,
        null_polarity: true,
        values: vec![cellar_engine::ScannedValue::String(prefix.to_string())],
    };
    let result = service::list(
        &state.db,
        &def,
        service::ListQuery { limit: 1, filters: vec![condition], ..Default::default() },
    )
    .await
    .ok()?;
    let row = result.data.into_iter().next()?;

    let hash = row.get("hash")?.as_str()?.to_string();
    if !verify_api_key(secret, &hash) {
        return None;
    }

    let id = row.get("id")?.as_str()?.to_string();
    let role = Role::from_str(row.get("role")?.as_str()?).unwrap_or(Role::User);
    let can_write = row.get("can_write").and_then(Value::as_bool).unwrap_or(false);

    let mut stamp = Map::new();
    stamp.insert("last_used_at".to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
    let _ = service::update(&state.db, &def, &id, &stamp).await;

    Some(Identity::ApiKey { id, role, can_write })
}

pub async fn list(state: &SharedState, identity: Option<Identity>, query: ParsedQuery) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let def = bootstrap::apikeys_collection_def();
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
    let def = bootstrap::apikeys_collection_def();
    let id = query.id.ok_or_else(|| Error::bad_request("'id' query parameter is required"))?;
    let record =
        service::get(&state.db, &def, &id).await?.ok_or_else(|| Error::not_found(format!("api key '{id}' not found")))?;
    Ok(crate::http::schema::envelope(query.schema, serde_json::json!({ "data": redact(record) }), &def))
}

pub async fn create(state: &SharedState, identity: Option<Identity>, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let def = bootstrap::apikeys_collection_def();

    let data = body
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::bad_request("request body must include a 'data' object"))?;

    let generated = generate_api_key();
    let mut payload = data.clone();
    payload.insert("prefix".to_string(), Value::String(generated.prefix.clone()));
    payload.insert("hash".to_string(), Value::String(generated.hash.clone()));
    payload.insert("created_at".to_string(), Value::String(chrono::Utc::now().to_rfc3339()));

    let record = service::create(&state.db, &def, &payload).await?;
    let mut response = redact(record);
    if let Value::Object(map) = &mut response {
        map.insert("key".to_string(), Value::String(generated.secret));
    }
    Ok(serde_json::json!({ "data": response }))
}

pub async fn update(state: &SharedState, identity: Option<Identity>, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let def = bootstrap::apikeys_collection_def();

    let id = body.get("id").and_then(Value::as_str).ok_or_else(|| Error::bad_request("'id' is required"))?;
    let rotate = body.get("action").and_then(Value::as_str) == Some("rotate");

    if rotate {
        let generated = generate_api_key();
        let mut payload = Map::new();
        payload.insert("prefix".to_string(), Value::String(generated.prefix.clone()));
        payload.insert("hash".to_string(), Value::String(generated.hash.clone()));
        let record = service::update(&state.db, &def, id, &payload).await?;
        let mut response = redact(record);
        if let Value::Object(map) = &mut response {
            map.insert("key".to_string(), Value::String(generated.secret));
        }
        return Ok(serde_json::json!({ "data": response }));
    }

    let payload = body
        .get("data")
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| Error::bad_request("request body must include a 'data' object, or \"action\": \"rotate\""))?;
    let record = service::update(&state.db, &def, id, &payload).await?;
    Ok(serde_json::json!({ "data": redact(record) }))
}

pub async fn destroy(state: &SharedState, identity: Option<Identity>, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let def = bootstrap::apikeys_collection_def();
    let id = body.get("id").and_then(Value::as_str).ok_or_else(|| Error::bad_request("'id' is required"))?;
    service::destroy(&state.db, &def, id).await?;
    Ok(serde_json::json!({ "deleted": true }))
}
