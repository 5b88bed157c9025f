//! API-key generation and verification.
//!
//! A key's secret is shown to the client exactly once, at creation or
//! rotation time; only a deterministic digest of it is ever persisted. The
//! first 8 characters of the secret are stored unencrypted alongside the
//! digest as a lookup prefix, so the storage layer can index on it instead
//! of scanning every stored key to find a match; the full digest is still
//! compared, in constant time, before a key is accepted.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SECRET_LENGTH: usize = 40;
const PREFIX_LENGTH: usize = 8;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub struct GeneratedApiKey {
    /// Shown to the client exactly once. Never stored.
    pub secret: String,
    /// Stored unencrypted; used to narrow the lookup to one candidate row.
    pub prefix: String,
    /// Stored in place of the secret.
    pub hash: String,
}

/// Generates a new high-entropy secret and its storable form.
pub fn generate_api_key() -> GeneratedApiKey {
    let mut rng = rand::thread_rng();
    let secret: String = (0..SECRET_LENGTH).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect();
    let prefix = secret[..PREFIX_LENGTH].to_string();
    let hash = hash_secret(&secret);
    GeneratedApiKey { secret, prefix, hash }
}

/// Verifies a presented secret against a stored digest in constant time.
pub fn verify_api_key(presented_secret: &str, stored_hash: &str) -> bool {
    let computed = hash_secret(presented_secret);
    computed.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// The prefix used to narrow a key lookup to a candidate row, derived from
/// the presented secret the same way it was derived at generation time.
pub fn lookup_prefix(presented_secret: &str) -> Option<&str> {
    presented_secret.get(..PREFIX_LENGTH)
}

fn hash_secret(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
