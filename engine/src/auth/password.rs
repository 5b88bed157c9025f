//! Password hashing and verification, bcrypt-family per the data model.

use crate::errors::Error;

const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

pub fn hash_password(raw: &str) -> Result<String, Error> {
    bcrypt::hash(raw, DEFAULT_COST).map_err(|e| Error::Internal(format!("password hashing failed: {e}")))
}

/// Verifies a password, collapsing any bcrypt-internal error (a corrupt
/// stored hash, for instance) into a plain `false` rather than surfacing it —
/// a malformed hash must never be distinguishable from a wrong password.
pub fn verify_password(raw: &str, hash: &str) -> bool {
    bcrypt::verify(raw, hash).unwrap_or(false)
}
