//! Agent transport kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The physical transport a node agent is connected over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Bidirectional gRPC stream.
    Stream,
    /// WebSocket connection upgraded from HTTP.
    #[serde(rename = "websocket")]
    WebSocket,
}

impl TransportKind {
    /// Short name used in logs and health output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::WebSocket => "websocket",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
