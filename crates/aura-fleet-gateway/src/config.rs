//! Gateway configuration types.
//!
//! This module defines configuration structures for the HTTP, WebSocket and
//! gRPC listeners.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// HTTP listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// gRPC listen address (e.g., "0.0.0.0:9090").
    #[serde(default = "GatewayConfig::default_grpc_listen_addr")]
    pub grpc_listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Bearer key for operator routes. Operator routes reject every call when
    /// this is unset.
    #[serde(default)]
    pub operator_token: Option<String>,

    /// WebSocket transport settings.
    #[serde(default)]
    pub websocket: WsConfig,

    /// gRPC stream transport settings.
    #[serde(default)]
    pub stream: StreamConfig,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    fn default_grpc_listen_addr() -> String {
        "0.0.0.0:9090".to_string()
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Build a configuration from the defaults overridden by environment
    /// variables.
    ///
    /// Reads `LISTEN_ADDR`, `GRPC_LISTEN_ADDR`, `OPERATOR_TOKEN`, and
    /// `CORS_ORIGINS` (comma separated).
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Ok(addr) = std::env::var("GRPC_LISTEN_ADDR") {
            config.grpc_listen_addr = addr;
        }
        config.operator_token = std::env::var("OPERATOR_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.cors_origins = parse_origins(&origins);
        }
        config
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            grpc_listen_addr: Self::default_grpc_listen_addr(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            operator_token: None,
            websocket: WsConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WsConfig {
    /// Outbound queue capacity per connection.
    #[serde(default = "WsConfig::default_queue_capacity")]
    pub queue_capacity: usize,

    /// Interval between server pings, in seconds.
    #[serde(default = "WsConfig::default_ping_interval")]
    pub ping_interval_seconds: u64,

    /// Read deadline renewed by every inbound frame, in seconds.
    #[serde(default = "WsConfig::default_idle_timeout")]
    pub idle_timeout_seconds: u64,

    /// Deadline for a single write, in seconds.
    #[serde(default = "WsConfig::default_write_timeout")]
    pub write_timeout_seconds: u64,
}

impl WsConfig {
    const fn default_queue_capacity() -> usize {
        256
    }

    const fn default_ping_interval() -> u64 {
        54
    }

    const fn default_idle_timeout() -> u64 {
        60
    }

    const fn default_write_timeout() -> u64 {
        10
    }

    /// Get the ping interval as a `Duration`.
    #[must_use]
    pub const fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Get the idle timeout as a `Duration`.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    /// Get the write timeout as a `Duration`.
    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_seconds)
    }
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: Self::default_queue_capacity(),
            ping_interval_seconds: Self::default_ping_interval(),
            idle_timeout_seconds: Self::default_idle_timeout(),
            write_timeout_seconds: Self::default_write_timeout(),
        }
    }
}

/// gRPC stream connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Outbound queue capacity per connection.
    #[serde(default = "StreamConfig::default_queue_capacity")]
    pub queue_capacity: usize,
}

impl StreamConfig {
    const fn default_queue_capacity() -> usize {
        64
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            queue_capacity: Self::default_queue_capacity(),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(ToString::to_string)
        .collect()
}
