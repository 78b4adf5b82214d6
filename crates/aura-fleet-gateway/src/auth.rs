//! Authentication extractors.
//!
//! [`AuthNode`] resolves a node bearer token through the configured
//! validator. [`OperatorAuth`] guards the operator routes with a static key.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use aura_fleet_auth::{strip_bearer, AuthError, AuthenticatedNode, TokenValidator};
use aura_fleet_control::{FleetControl, NodeId};

use crate::error::ApiError;
use crate::state::GatewayState;

/// An authenticated node extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthNode {
    /// The node the token belongs to.
    pub node_id: NodeId,
    /// Hash of the presented token.
    pub token_hash: String,
}

impl From<AuthenticatedNode> for AuthNode {
    fn from(node: AuthenticatedNode) -> Self {
        Self {
            node_id: node.node_id,
            token_hash: node.token_hash,
        }
    }
}

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

#[axum::async_trait]
impl<C, V> FromRequestParts<Arc<GatewayState<C, V>>> for AuthNode
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<C, V>>,
    ) -> Result<Self, Self::Rejection> {
        let header = authorization(parts).ok_or(AuthError::MissingToken)?;
        let node = state.validator.validate(header).await?;
        Ok(node.into())
    }
}

/// Compare two keys without leaking the matching prefix length.
///
/// `blake3::Hash` equality runs in constant time.
fn keys_match(presented: &str, expected: &str) -> bool {
    blake3::hash(presented.as_bytes()) == blake3::hash(expected.as_bytes())
}

/// Marker for a request that carried the operator key.
#[derive(Debug, Clone, Copy)]
pub struct OperatorAuth;

#[axum::async_trait]
impl<C, V> FromRequestParts<Arc<GatewayState<C, V>>> for OperatorAuth
where
    C: FleetControl + 'static,
    V: TokenValidator + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<GatewayState<C, V>>,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .config
            .operator_token
            .as_deref()
            .ok_or(ApiError::Unauthorized)?;
        let presented = authorization(parts).map(strip_bearer).unwrap_or_default();

        if !presented.is_empty() && keys_match(presented, expected) {
            Ok(Self)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}
