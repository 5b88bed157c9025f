//! `auth:{login,refresh}` — the only two unauthenticated-by-default
//! endpoints in the dispatch table (refresh still requires a valid, if
//! possibly near-expired in the future, bearer token).

use serde_json::Value;

use cellar_engine::auth::{verify_password, Identity, Role};
use cellar_engine::{bootstrap, service, Condition, Error, Operator, ScannedValue};

use crate::state::SharedState;

pub async fn login(state: &SharedState, body: Value) -> Result<Value, Error> {
    let username = body.get("username").and_then(Value::as_str).ok_or_else(|| Error::bad_request("'username' is required"))?;
    let password = body.get("password").and_then(Value::as_str).ok_or_else(|| Error::bad_request("'password' is required"))?;

    state.login_limiter.check(username)?;

    let def = bootstrap::users_collection_def();
    let condition = Condition {
        field: "username".to_string(),
        operator: Operator::Eq,
        null_polarity: true,
        values: vec![ScannedValue::String(username.to_string())],
    };
    let result = service::list(&state.db, &def, service::ListQuery { limit: 1, filters: vec![condition], ..Default::default() }).await?;

    let record = match result.data.into_iter().next() {
        Some(r) => r,
        None => {
            state.login_limiter.record_failure(username);
            return Err(Error::Unauthorized("invalid username or password".into()));
        }
    };

    let hash = record.get("password_hash").and_then(Value::as_str).unwrap_or_default();
    if !verify_password(password, hash) {
        state.login_limiter.record_failure(username);
        return Err(Error::Unauthorized("invalid username or password".into()));
    }
    state.login_limiter.reset(username);

    let id = record.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
    let role = record.get("role").and_then(Value::as_str).and_then(Role::from_str).unwrap_or(Role::User);
    let can_write = record.get("can_write").and_then(Value::as_bool).unwrap_or(false);
    let identity = Identity::PasswordUser { id: id.clone(), username: username.to_string(), role, can_write };

    let (access_token, expires_in) = state.tokens.issue(&identity)?;
    Ok(serde_json::json!({
        "access_token": access_token,
        "expires_in": expires_in,
        "user": {
            "id": id,
            "username": username,
            "email": record.get("email"),
            "role": role.as_str(),
            "can_write": can_write,
        },
    }))
}

/// Re-issues a token carrying the presented one's claims forward with a
/// fresh expiry. The presented token must still verify — an already-expired
/// token must go back through `login`.
pub async fn refresh(state: &SharedState, identity: Option<Identity>) -> Result<Value, Error> {
    let identity = identity.ok_or_else(|| Error::Unauthorized("missing or invalid credential".into()))?;
    if !matches!(identity, Identity::PasswordUser { .. }) {
        return Err(Error::bad_request("refresh is only valid for password-issued tokens"));
    }
    let (access_token, expires_in) = state.tokens.issue(&identity)?;
    Ok(serde_json::json!({ "access_token": access_token, "expires_in": expires_in }))
}
