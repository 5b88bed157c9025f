//! # Auth/Authz Pipeline
//!
//! Two credential kinds resolve to the same [`identity::Identity`]: a
//! password login exchanged for a short-lived bearer token, and a
//! long-lived API key. Everything downstream of resolution — the
//! capability check a route's middleware performs — only ever looks at
//! `role` and `can_write`, never at which credential kind produced them.

pub mod apikey;
pub mod identity;
pub mod password;
pub mod ratelimit;
pub mod token;

pub use apikey::{generate_api_key, verify_api_key, GeneratedApiKey};
pub use identity::{Identity, Role};
pub use password::{hash_password, verify_password};
pub use ratelimit::LoginRateLimiter;
pub use token::{Claims, TokenIssuer};
