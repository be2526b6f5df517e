//! `tracing_subscriber::fmt` initialization.

use tracing_subscriber::{fmt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Marker returned by [`init_tracing`]; holding it is not required, but it
/// keeps the call site symmetrical with other init functions that do return
/// a live guard.
pub struct TracingGuard;

/// Install a global `tracing` subscriber from the given configuration.
///
/// `RUST_LOG` (or `config.log_level` when unset) drives the filter; output
/// is pretty-printed for local development or JSON when `json_logs` is set.
pub fn init_tracing(config: &TelemetryConfig) -> Result<TracingGuard, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    let subscriber = fmt().with_env_filter(env_filter);

    let result = if config.json_logs {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    result.map_err(|e| TelemetryError::TracerInit(e.to_string()))?;

    tracing::info!(service = %config.service_name, "tracing initialized");
    Ok(TracingGuard)
}

#[cfg(test)]
mod tests {
    // A global subscriber can only be installed once per process; exercising
    // init_tracing belongs in an integration test, not a unit test that may
    // run alongside others in the same process.
}
