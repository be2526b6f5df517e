//! # Outbound Subscription
//!
//! The receiving end of an `OutboundBus` subscription.

use governance_types::events::OutboundEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// A subscription handle for receiving outbound events.
pub struct OutboundSubscription {
    receiver: broadcast::Receiver<OutboundEvent>,
}

impl OutboundSubscription {
    pub(crate) fn new(receiver: broadcast::Receiver<OutboundEvent>) -> Self {
        Self { receiver }
    }

    /// Receive the next event, transparently skipping over a lag gap.
    pub async fn recv(&mut self) -> Option<OutboundEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "outbound subscriber lagged, events dropped");
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::OutboundBus;
    use governance_types::entities::{AgreementId, AgreementProtocol};

    #[tokio::test]
    async fn recv_returns_none_once_the_bus_is_dropped() {
        let bus = OutboundBus::new();
        let mut sub = bus.subscribe();
        drop(bus);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_over_a_lag_gap() {
        let bus = OutboundBus::with_capacity(2);
        let mut sub = bus.subscribe();
        for i in 0..5 {
            bus.publish(OutboundEvent::GovernanceCancelation {
                agreement_id: AgreementId::from(format!("a{i}").as_str()),
                protocol: AgreementProtocol::BasicProducer,
                deployment: None,
            });
        }
        assert!(sub.recv().await.is_some());
    }
}
