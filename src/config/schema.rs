//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the request server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS, connection limit).
    pub listener: ListenerConfig,

    /// Further listeners served by the same workers, e.g. a TLS port next
    /// to a plaintext one.
    pub additional_listeners: Vec<ListenerConfig>,

    /// Worker pool and job queue sizing.
    pub workers: WorkerConfig,

    /// Request head parsing limits.
    pub limits: LimitsConfig,

    /// Optional deadlines. All disabled by default.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:50051").
    pub bind_address: String,

    /// Optional TLS configuration. When present every accepted connection
    /// must complete a TLS handshake before it is read.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent connections (backpressure on accept).
    pub max_connections: usize,

    /// Disable Nagle's algorithm on accepted sockets.
    pub tcp_nodelay: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:50051".to_string(),
            tls: None,
            max_connections: 10_000,
            tcp_nodelay: true,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of workers executing handlers concurrently.
    pub count: usize,

    /// Total number of parsed requests the job queue buffers.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 100,
            queue_capacity: 100,
        }
    }
}

/// Limits applied while parsing a request head.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Longest accepted request line or header line, in bytes.
    pub max_line_bytes: usize,

    /// Most header lines accepted in one request.
    pub max_headers: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 8 * 1024,
            max_headers: 100,
        }
    }
}

/// Timeout configuration. `None` means wait forever.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed to read one complete request head, in seconds.
    pub read_secs: Option<u64>,

    /// Time allowed for a TLS handshake, in seconds.
    pub handshake_secs: Option<u64>,

    /// Time allowed for one handler invocation, in seconds.
    pub handler_secs: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_baseline() {
        let config = ServerConfig::default();
        assert_eq!(config.workers.queue_capacity, 100);
        assert!(config.listener.tls.is_none());
        assert!(config.listener.tcp_nodelay);
        assert!(config.timeouts.read_secs.is_none());
        assert!(config.timeouts.handler_secs.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [workers]
            count = 4

            [listener]
            bind_address = "127.0.0.1:9000"

            [listener.tls]
            cert_path = "server.crt"
            key_path = "server.key"
            "#,
        )
        .unwrap();

        assert_eq!(config.workers.count, 4);
        assert_eq!(config.workers.queue_capacity, 100);
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.listener.max_connections, 10_000);
        let tls = config.listener.tls.unwrap();
        assert_eq!(tls.cert_path, "server.crt");
        assert_eq!(tls.key_path, "server.key");
        assert!(config.additional_listeners.is_empty());
    }

    #[test]
    fn additional_listeners_parse_as_table_array() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "0.0.0.0:50051"

            [[additional_listeners]]
            bind_address = "0.0.0.0:50052"
            tls = { cert_path = "localhost.crt", key_path = "localhost.key" }
            "#,
        )
        .unwrap();

        assert_eq!(config.additional_listeners.len(), 1);
        let secure = &config.additional_listeners[0];
        assert_eq!(secure.bind_address, "0.0.0.0:50052");
        assert_eq!(secure.max_connections, 10_000);
        assert_eq!(secure.tls.as_ref().unwrap().cert_path, "localhost.crt");
    }
}
