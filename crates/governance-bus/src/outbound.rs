//! # Outbound Event Bus
//!
//! Broadcasts `OutboundEvent`s to whichever peer subsystems (container
//! runtime, fetch subsystem, API layer) have subscribed. Modeled directly on
//! an in-memory `tokio::sync::broadcast` publisher: any number of
//! subscribers may attach, and a subscriber that falls behind drops its
//! oldest buffered events rather than stalling the publisher.

use std::sync::atomic::{AtomicU64, Ordering};

use governance_types::events::OutboundEvent;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::outbound_subscription::OutboundSubscription;

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

pub struct OutboundBus {
    sender: broadcast::Sender<OutboundEvent>,
    events_published: AtomicU64,
}

impl OutboundBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> OutboundSubscription {
        OutboundSubscription::new(self.sender.subscribe())
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    /// Publish an event. Returns the number of subscribers it reached.
    pub fn publish(&self, event: OutboundEvent) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        match self.sender.send(event) {
            Ok(count) => {
                debug!(receivers = count, "outbound event published");
                count
            }
            Err(_) => {
                warn!("outbound event dropped, no subscribers");
                0
            }
        }
    }
}

impl Default for OutboundBus {
    fn default() -> Self {
        Self::new()
    }
}
