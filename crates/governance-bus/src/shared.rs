//! # Shared State Cells
//!
//! Two pieces of process-wide state that every component needs to read and
//! exactly one ever writes: whether the core may write to the blockchain
//! yet, and the current device registry token. Neither is persisted; a
//! restart re-derives both from the first inbound events that arrive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

/// Flips once and only once, from the funding event to true. Never flips
/// back.
#[derive(Clone)]
pub struct BlockchainWritesGate {
    enabled: Arc<AtomicBool>,
}

impl BlockchainWritesGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl Default for BlockchainWritesGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the most recently registered device token, consulted by the
/// registry client on every outbound call.
#[derive(Clone)]
pub struct DeviceTokenCell {
    token: Arc<RwLock<String>>,
}

impl DeviceTokenCell {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: Arc::new(RwLock::new(String::new())),
        }
    }

    pub async fn set(&self, token: String) {
        *self.token.write().await = token;
    }

    pub async fn get(&self) -> String {
        self.token.read().await.clone()
    }
}

impl Default for DeviceTokenCell {
    fn default() -> Self {
        Self::new()
    }
}
