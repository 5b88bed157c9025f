//! Bearer-token issuance and verification.
//!
//! Claims carry exactly what the authorization middleware needs to resolve
//! capability without a database round-trip: subject, role, and write
//! capability, alongside the standard expiry claim.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::identity::{Identity, Role};
use crate::errors::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub can_write: bool,
    pub exp: usize,
}

#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    expiry_seconds: i64,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, expiry_seconds: i64) -> Self {
        Self { secret: secret.into(), expiry_seconds }
    }

    pub fn expiry_seconds(&self) -> i64 {
        self.expiry_seconds
    }

    /// Issues a token for `identity`, returning the encoded token and its
    /// lifetime in seconds.
    pub fn issue(&self, identity: &Identity) -> Result<(String, i64), Error> {
        let exp = (chrono::Utc::now() + chrono::Duration::seconds(self.expiry_seconds)).timestamp() as usize;
        let claims = Claims { sub: identity.id().to_string(), role: identity.role(), can_write: identity.can_write(), exp };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| Error::Internal(format!("token signing failed: {e}")))?;
        Ok((token, self.expiry_seconds))
    }

    /// Verifies a token's signature and expiry, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, Error> {
        let data = decode::<Claims>(token, &DecodingKey::from_secret(self.secret.as_bytes()), &Validation::default())
            .map_err(|_| Error::Unauthorized("invalid or expired token".into()))?;
        Ok(data.claims)
    }

    /// Re-issues a token from an already-valid one, carrying its claims
    /// forward with a fresh expiry. The caller is responsible for rejecting
    /// an already-expired token before calling this (`verify` does that).
    pub fn refresh(&self, claims: &Claims) -> Result<(String, i64), Error> {
        let exp = (chrono::Utc::now() + chrono::Duration::seconds(self.expiry_seconds)).timestamp() as usize;
        let refreshed = Claims { sub: claims.sub.clone(), role: claims.role, can_write: claims.can_write, exp };
        let token = encode(&Header::default(), &refreshed, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| Error::Internal(format!("token signing failed: {e}")))?;
        Ok((token, self.expiry_seconds))
    }
}

impl From<Role> for &'static str {
    fn from(role: Role) -> Self {
        role.as_str()
    }
}
