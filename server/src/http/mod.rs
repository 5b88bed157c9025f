//! The HTTP surface: request parsing, dispatch, and the per-resource
//! handlers the dispatcher routes to. Nothing here owns business logic it
//! doesn't have to — `collections.rs`/`users.rs`/`apikeys.rs`/`auth.rs`
//! hold the authorization checks, `cellar_engine` holds everything else.

pub mod apikeys;
pub mod authz;
pub mod auth;
pub mod collections;
pub mod dispatch;
pub mod health;
pub mod middleware;
pub mod query_string;
pub mod records;
pub mod response;
pub mod schema;
pub mod users;
