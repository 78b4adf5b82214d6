//! Node token format, hashing, and generation.

use base64::prelude::*;

/// Prefix every node token starts with.
pub const TOKEN_PREFIX: &str = "aura-node_";

/// Hash a plain token for storage and lookup.
///
/// The hash is the hex-encoded blake3 digest of the full token, prefix included.
#[must_use]
pub fn hash_token(token: &str) -> String {
    hex::encode(blake3::hash(token.as_bytes()).as_bytes())
}

/// Returns true if the token carries the node token prefix.
#[must_use]
pub fn has_token_prefix(token: &str) -> bool {
    token.starts_with(TOKEN_PREFIX)
}

/// Generate a new node token.
///
/// Returns `(plain, hash)`. The plain token is shown to the operator once;
/// only the hash is persisted.
#[must_use]
pub fn generate_token() -> (String, String) {
    let mut random = [0u8; 32];
    random[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    random[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());

    let plain = format!("{TOKEN_PREFIX}{}", BASE64_URL_SAFE_NO_PAD.encode(random));
    let hash = hash_token(&plain);
    (plain, hash)
}
