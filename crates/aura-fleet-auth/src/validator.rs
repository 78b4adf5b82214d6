//! Node token validation.
//!
//! A token is checked once per connection attempt or request-response call.
//! Validation never caches results, so a revoked credential stops new
//! connections immediately.

use std::sync::Arc;

use async_trait::async_trait;
use aura_fleet_core::NodeId;
use aura_fleet_store::CredentialStore;

use crate::error::{AuthError, Result};
use crate::token::{has_token_prefix, hash_token};

/// A node that presented a valid, unrevoked token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedNode {
    /// The node the token is bound to.
    pub node_id: NodeId,
    /// Hash of the presented token, used to refresh `last_seen_at`.
    pub token_hash: String,
}

/// Trait for validating node bearer tokens.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validate a raw credential value and resolve the node it belongs to.
    ///
    /// The value may carry a leading `Bearer `.
    ///
    /// # Errors
    ///
    /// Returns an unauthenticated error for missing, malformed, unknown, or
    /// revoked tokens, and `AuthError::Internal` if the lookup fails.
    async fn validate(&self, raw: &str) -> Result<AuthenticatedNode>;
}

/// Strip an optional `Bearer ` scheme and surrounding whitespace.
#[must_use]
pub fn strip_bearer(raw: &str) -> &str {
    let raw = raw.trim();
    raw.strip_prefix("Bearer ").map_or(raw, str::trim)
}

/// Validator backed by a [`CredentialStore`].
pub struct StoreTokenValidator<S> {
    store: Arc<S>,
}

impl<S> StoreTokenValidator<S> {
    /// Create a validator over the given credential store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: CredentialStore + 'static> TokenValidator for StoreTokenValidator<S> {
    async fn validate(&self, raw: &str) -> Result<AuthenticatedNode> {
        let token = strip_bearer(raw);
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        if !has_token_prefix(token) {
            return Err(AuthError::InvalidFormat);
        }

        let token_hash = hash_token(token);
        let credential = self
            .store
            .find_credential_by_hash(&token_hash)?
            .ok_or(AuthError::UnknownToken)?;

        if credential.is_revoked() {
            tracing::debug!(node_id = %credential.node_id, "Rejected revoked node token");
            return Err(AuthError::Revoked);
        }

        Ok(AuthenticatedNode {
            node_id: credential.node_id,
            token_hash,
        })
    }
}

/// A mock token validator for testing.
///
/// This validator accepts any token in the format `aura-node_<node_uuid>` and
/// resolves it to that node.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockTokenValidator;

#[cfg(any(test, feature = "test-utils"))]
impl MockTokenValidator {
    /// Build the token this validator accepts for a node.
    #[must_use]
    pub fn token_for(node_id: &NodeId) -> String {
        format!("{}{node_id}", crate::token::TOKEN_PREFIX)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl TokenValidator for MockTokenValidator {
    async fn validate(&self, raw: &str) -> Result<AuthenticatedNode> {
        let token = strip_bearer(raw);
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        let rest = token
            .strip_prefix(crate::token::TOKEN_PREFIX)
            .ok_or(AuthError::InvalidFormat)?;
        let node_id: NodeId = rest.parse().map_err(|_| AuthError::UnknownToken)?;

        Ok(AuthenticatedNode {
            node_id,
            token_hash: hash_token(token),
        })
    }
}
