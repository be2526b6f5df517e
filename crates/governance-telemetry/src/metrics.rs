//! Prometheus metrics for the governance core.
//!
//! Metric names follow `governance_<component>_<metric>_<unit>`.

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry.
    pub static ref REGISTRY: Registry = Registry::new();

    /// Agreements for which execution was started.
    pub static ref AGREEMENTS_EXECUTING: Counter = Counter::new(
        "governance_agreements_executing_total",
        "Total agreements that entered the executing state"
    ).expect("metric creation failed");

    /// Agreements finalized by the finalization loop.
    pub static ref AGREEMENTS_FINALIZED: Counter = Counter::new(
        "governance_agreements_finalized_total",
        "Total agreements finalized"
    ).expect("metric creation failed");

    /// Agreements cancelled, labeled by reason code name.
    pub static ref AGREEMENTS_CANCELLED: CounterVec = CounterVec::new(
        Opts::new("governance_agreements_cancelled_total", "Total agreements cancelled"),
        &["reason"]
    ).expect("metric creation failed");

    /// Registry HTTP calls, labeled by outcome.
    pub static ref REGISTRY_CALLS: CounterVec = CounterVec::new(
        Opts::new("governance_registry_calls_total", "Total registry HTTP calls"),
        &["outcome"]
    ).expect("metric creation failed");
}

/// Handle kept alive for the metrics registration's lifetime.
pub struct MetricsHandle;

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record that an agreement's execution started.
pub fn record_agreement_executing() {
    AGREEMENTS_EXECUTING.inc();
}

/// Record that an agreement was observed finalized on-chain.
pub fn record_agreement_finalized() {
    AGREEMENTS_FINALIZED.inc();
}

/// Record that an agreement was cancelled, labeled by reason name.
pub fn record_agreement_cancelled(reason: &str) {
    AGREEMENTS_CANCELLED.with_label_values(&[reason]).inc();
}

/// Record a registry HTTP call outcome (e.g. `"put_ok"`, `"delete_ok"`).
pub fn record_registry_call(outcome: &str) {
    REGISTRY_CALLS.with_label_values(&[outcome]).inc();
}

/// Register all metrics with the global registry. Call once at startup.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    REGISTRY
        .register(Box::new(AGREEMENTS_EXECUTING.clone()))
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    REGISTRY
        .register(Box::new(AGREEMENTS_FINALIZED.clone()))
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    REGISTRY
        .register(Box::new(AGREEMENTS_CANCELLED.clone()))
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    REGISTRY
        .register(Box::new(REGISTRY_CALLS.clone()))
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    Ok(MetricsHandle)
}

/// Render the registry in Prometheus text exposition format.
pub fn gather_text() -> Result<String, TelemetryError> {
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_counter_accepts_a_reason_label() {
        AGREEMENTS_CANCELLED
            .with_label_values(&["NOT_FINALIZED_TIMEOUT"])
            .inc();
        assert!(AGREEMENTS_CANCELLED
            .with_label_values(&["NOT_FINALIZED_TIMEOUT"])
            .get()
            >= 1.0);
    }
}
