//! The health loop (C4): every sixty seconds, emits a liveness probe
//! trigger for every running, unterminated agreement. Never cancels
//! anything itself — that's the finalization loop's and the processor's
//! job.

use std::sync::Arc;

use governance_bus::OutboundBus;
use governance_types::events::OutboundEvent;
use tracing::{error, info};

use crate::ports::AgreementStore;

const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

pub struct HealthLoop {
    pub store: Arc<dyn AgreementStore>,
    pub outbound: Arc<OutboundBus>,
}

impl HealthLoop {
    pub async fn run(self) {
        info!("health loop starting");
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    pub async fn tick(&self) {
        let running = match self
            .store
            .scan(&|a| {
                !a.archived
                    && a.execution_start_time != 0
                    && a.terminated_time == 0
                    && a.has_counterparty()
            })
            .await
        {
            Ok(running) => running,
            Err(e) => {
                error!(error = %e, "health loop: scan failed this tick");
                return;
            }
        };

        for agreement in running {
            self.outbound.publish(OutboundEvent::GovernanceMaintenance {
                agreement_id: agreement.agreement_id,
                protocol: agreement.protocol,
                deployment: agreement.current_deployment,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governance_types::entities::{AgreementId, AgreementProtocol, Deployment, EstablishedAgreement, Proposal, ProposalSig};

    use crate::ports::InMemoryAgreementStore;

    fn running(id: &str) -> EstablishedAgreement {
        EstablishedAgreement {
            agreement_id: AgreementId::from(id),
            protocol: AgreementProtocol::BasicProducer,
            counter_party_address: "0xabc".to_string(),
            proposal: Proposal(vec![]),
            proposal_sig: ProposalSig(vec![]),
            creation_time: 10,
            accepted_time: 15,
            execution_start_time: 20,
            finalized_time: 25,
            terminated_time: 0,
            current_deployment: Deployment::new(),
            archived: false,
            on_chain_terminated: false,
        }
    }

    #[tokio::test]
    async fn tick_emits_maintenance_for_each_running_agreement() {
        let store = Arc::new(InMemoryAgreementStore::new());
        store.insert(running("a1")).await.unwrap();
        let outbound = Arc::new(OutboundBus::new());
        let mut subscription = outbound.subscribe();

        let health = HealthLoop {
            store,
            outbound: outbound.clone(),
        };
        health.tick().await;

        let event = subscription.recv().await.unwrap();
        assert!(matches!(event, OutboundEvent::GovernanceMaintenance { .. }));
    }

    #[tokio::test]
    async fn tick_skips_agreements_without_a_counterparty() {
        let store = Arc::new(InMemoryAgreementStore::new());
        let mut unaccepted = running("a1");
        unaccepted.counter_party_address.clear();
        store.insert(unaccepted).await.unwrap();
        let outbound = Arc::new(OutboundBus::new());

        let health = HealthLoop {
            store,
            outbound: outbound.clone(),
        };
        health.tick().await;

        assert_eq!(outbound.events_published(), 0);
    }
}
