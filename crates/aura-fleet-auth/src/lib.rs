//! Node token authentication for aura-fleet.
//!
//! Agents authenticate with an opaque bearer token of the form
//! `aura-node_<random>`. Only the blake3 hash of the token is stored; the
//! validator hashes the presented value and resolves it through a
//! [`CredentialStore`](aura_fleet_store::CredentialStore).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌────────────────────┐
//! │   Gateway        │────▶│   TokenValidator   │
//! │ (HTTP/WS/gRPC)   │     │   (trait)          │
//! └──────────────────┘     └─────────┬──────────┘
//!                                    │
//!                          ┌─────────▼──────────┐
//!                          │ StoreTokenValidator│
//!                          └─────────┬──────────┘
//!                                    │ hash lookup
//!                          ┌─────────▼──────────┐
//!                          │  CredentialStore   │
//!                          └────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use aura_fleet_auth::{generate_token, StoreTokenValidator, TokenValidator};
//! use aura_fleet_store::{CredentialStore, NodeCredential, RocksStore};
//! use aura_fleet_core::NodeId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/aura-fleet-db")?);
//! let (plain, hash) = generate_token();
//! store.put_credential(&NodeCredential::new(hash, NodeId::generate()))?;
//!
//! let validator = StoreTokenValidator::new(store);
//! let node = validator.validate(&format!("Bearer {plain}")).await?;
//! println!("Node ID: {}", node.node_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod token;
pub mod validator;

pub use error::{AuthError, Result};
pub use token::{generate_token, hash_token, TOKEN_PREFIX};
pub use validator::{strip_bearer, AuthenticatedNode, StoreTokenValidator, TokenValidator};

#[cfg(any(test, feature = "test-utils"))]
pub use validator::MockTokenValidator;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_status_codes() {
        assert_eq!(AuthError::MissingToken.http_status_code(), 401);
        assert_eq!(AuthError::InvalidFormat.http_status_code(), 401);
        assert_eq!(AuthError::UnknownToken.http_status_code(), 401);
        assert_eq!(AuthError::Revoked.http_status_code(), 401);
        assert_eq!(AuthError::Internal("db".into()).http_status_code(), 500);
    }

    #[test]
    fn internal_is_not_unauthenticated() {
        assert!(AuthError::Revoked.is_unauthenticated());
        assert!(!AuthError::Internal("db".into()).is_unauthenticated());
    }

    #[test]
    fn bearer_stripping() {
        assert_eq!(strip_bearer("Bearer aura-node_x"), "aura-node_x");
        assert_eq!(strip_bearer("  aura-node_x "), "aura-node_x");
        assert_eq!(strip_bearer("Bearer "), "");
    }
}
