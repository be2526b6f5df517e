//! # Governance Telemetry
//!
//! Logging and metrics initialization for the governance core.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use governance_telemetry::{TelemetryConfig, init_telemetry};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config).expect("failed to init telemetry");
//! ```

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    gather_text, record_agreement_cancelled, record_agreement_executing,
    record_agreement_finalized, record_registry_call, register_metrics, MetricsHandle,
    AGREEMENTS_CANCELLED, AGREEMENTS_EXECUTING, AGREEMENTS_FINALIZED, REGISTRY_CALLS,
};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics. Call once, at process startup.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    let tracing_guard = tracing_setup::init_tracing(config)?;
    Ok(TelemetryGuard {
        _tracing: tracing_guard,
        _metrics: metrics_handle,
    })
}

/// Holds the initialized telemetry state for the process lifetime.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
    _metrics: MetricsHandle,
}
