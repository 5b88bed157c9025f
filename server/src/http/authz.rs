//! The authorization half of the pipeline: given the identity
//! [`crate::http::middleware::resolve_identity`] already resolved (or
//! didn't), decide whether a particular operation may proceed. Kept as
//! three tiny functions rather than a declarative per-route table, since
//! every handler already knows which rule applies to it.

use cellar_engine::auth::Identity;
use cellar_engine::Error;

/// Every data and admin endpoint requires a resolved identity.
pub fn require_identity(identity: Option<Identity>) -> Result<Identity, Error> {
    identity.ok_or_else(|| Error::Unauthorized("missing or invalid credential".into()))
}

/// Write operations require `role=admin || can_write=true`.
pub fn require_write(identity: &Identity) -> Result<(), Error> {
    if identity.can_write() {
        Ok(())
    } else {
        Err(Error::Forbidden("write capability required".into()))
    }
}

/// System-resource operations (`users:*`, `apikeys:*`, `collections:*`)
/// require `role=admin`.
pub fn require_admin(identity: &Identity) -> Result<(), Error> {
    if identity.can_manage_system_resources() {
        Ok(())
    } else {
        Err(Error::Forbidden("admin role required".into()))
    }
}
