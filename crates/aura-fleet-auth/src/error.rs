//! Authentication error types.

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while authenticating a node.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("missing token")]
    MissingToken,

    /// The credential does not carry the node token prefix.
    #[error("invalid token format")]
    InvalidFormat,

    /// No credential matches the token hash.
    #[error("unknown token")]
    UnknownToken,

    /// The credential exists but has been revoked.
    #[error("token revoked")]
    Revoked,

    /// The credential store could not be queried.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if the caller failed to authenticate, as opposed to the
    /// check itself failing.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::MissingToken | Self::InvalidFormat | Self::UnknownToken | Self::Revoked => 401,
            Self::Internal(_) => 500,
        }
    }
}

impl From<aura_fleet_store::StoreError> for AuthError {
    fn from(err: aura_fleet_store::StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}
