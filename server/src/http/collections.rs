//! `collections:{create,update,destroy,list,get}` — admin-only management
//! of the registry itself. Unlike the other system resources, collections
//! are not rows in a table this module queries through `service::*`; they
//! go through [`cellar_engine::Registry`] directly, since the registry is
//! what keeps the physical table and the `collections` system-table row in
//! lockstep.

use serde::Deserialize;
use serde_json::Value;

use cellar_engine::auth::Identity;
use cellar_engine::{CollectionDef, Column, Error};

use crate::http::authz::{require_admin, require_identity};
use crate::http::query_string::ParsedQuery;
use crate::state::SharedState;

pub async fn list(state: &SharedState, identity: Option<Identity>, _query: ParsedQuery) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let defs = state.registry.list();
    Ok(serde_json::json!({ "data": defs }))
}

pub async fn get(state: &SharedState, identity: Option<Identity>, query: ParsedQuery) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let name = query
        .filter_params
        .iter()
        .find(|(k, _)| k == "name")
        .map(|(_, v)| v.as_str())
        .ok_or_else(|| Error::bad_request("'name' query parameter is required"))?;
    let def = state.registry.get(name).ok_or_else(|| Error::not_found(format!("collection '{name}' not found")))?;
    Ok(serde_json::json!({ "data": def }))
}

pub async fn create(state: &SharedState, identity: Option<Identity>, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let def: CollectionDef = serde_json::from_value(body)
        .map_err(|e| Error::bad_request(format!("invalid collection definition: {e}")))?;
    let name = CollectionDef::normalize_name(&def.name)?;
    let def = CollectionDef::new(name, def.columns);
    def.validate()?;
    let registered = state.registry.register(def).await?;
    Ok(serde_json::json!({ "data": registered }))
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum UpdateAction {
    AddColumn { column: Column },
    DropColumn { column: String },
    Rename { new_name: String },
}

#[derive(Deserialize)]
struct UpdateBody {
    name: String,
    #[serde(flatten)]
    action: UpdateAction,
}

pub async fn update(state: &SharedState, identity: Option<Identity>, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let body: UpdateBody =
        serde_json::from_value(body).map_err(|e| Error::bad_request(format!("invalid update body: {e}")))?;

    let def = match body.action {
        UpdateAction::AddColumn { column } => state.registry.add_column(&body.name, column).await?,
        UpdateAction::DropColumn { column } => state.registry.drop_column(&body.name, &column).await?,
        UpdateAction::Rename { new_name } => state.registry.rename(&body.name, &new_name).await?,
    };
    Ok(serde_json::json!({ "data": def }))
}

#[derive(Deserialize)]
struct DestroyBody {
    name: String,
}

pub async fn destroy(state: &SharedState, identity: Option<Identity>, body: Value) -> Result<Value, Error> {
    let identity = require_identity(identity)?;
    require_admin(&identity)?;
    let body: DestroyBody =
        serde_json::from_value(body).map_err(|e| Error::bad_request(format!("invalid destroy body: {e}")))?;
    state.registry.drop(&body.name).await?;
    Ok(serde_json::json!({ "deleted": true }))
}
