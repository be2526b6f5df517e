//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for the governance core's logging and metrics surface.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line.
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error), overridden by
    /// `RUST_LOG` when set.
    pub log_level: String,

    /// Whether to emit JSON-formatted logs (containers) instead of the
    /// human-readable console format (local development).
    pub json_logs: bool,

    /// Prometheus metrics port.
    pub metrics_port: u16,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "agreement-governance-core".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_port: 9100,
        }
    }
}

impl TelemetryConfig {
    /// Build configuration from environment variables.
    ///
    /// - `GOVERNANCE_LOG_LEVEL` or `RUST_LOG`: log level (default: info)
    /// - `GOVERNANCE_JSON_LOGS`: emit JSON logs (default: false)
    /// - `GOVERNANCE_METRICS_PORT`: Prometheus metrics port (default: 9100)
    #[must_use]
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("GOVERNANCE_SERVICE_NAME")
                .unwrap_or_else(|_| "agreement-governance-core".to_string()),

            log_level: env::var("GOVERNANCE_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("GOVERNANCE_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            metrics_port: env::var("GOVERNANCE_METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9100),
        }
    }
}
