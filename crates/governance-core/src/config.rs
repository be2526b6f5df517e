//! Runtime configuration, read once at startup.
//!
//! Grouped the way the teacher's `NodeConfig` groups its sub-structs: one
//! flat struct, one `from_env` constructor with defaults, no builder.

use std::env;

/// Configuration consumed by [`crate::supervisor::GovernanceCore`].
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the blockchain JSON-RPC endpoint the adapter talks to.
    pub geth_url: String,

    /// Base URL of the device registry (`<exchange_url>/devices/...`).
    pub exchange_url: String,

    /// Seconds an agreement may sit unfinalized before C3 cancels it with
    /// `NOT_FINALIZED_TIMEOUT`.
    pub agreement_timeout_s: u64,

    /// This node's own device id, sent as the `deviceId` path segment on
    /// every registry call.
    pub device_id: String,
}

impl CoreConfig {
    /// Load from environment variables, falling back to development
    /// defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            geth_url: env::var("GOVERNANCE_GETH_URL")
                .unwrap_or_else(|_| "http://localhost:8545".to_string()),
            exchange_url: env::var("GOVERNANCE_EXCHANGE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            agreement_timeout_s: env::var("GOVERNANCE_AGREEMENT_TIMEOUT_S")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            device_id: env::var("GOVERNANCE_DEVICE_ID").unwrap_or_default(),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_falls_back_to_defaults_when_unset() {
        // SAFETY: single-threaded test, no concurrent env mutation in this process.
        unsafe {
            env::remove_var("GOVERNANCE_GETH_URL");
            env::remove_var("GOVERNANCE_AGREEMENT_TIMEOUT_S");
        }
        let config = CoreConfig::from_env();
        assert_eq!(config.geth_url, "http://localhost:8545");
        assert_eq!(config.agreement_timeout_s, 300);
    }
}
