//! The command processor (C2/C6): drains the bounded command queue strictly
//! in order on a single task, so two commands touching the same agreement
//! never race each other.
//!
//! Shape grounded in the teacher's handler `run()` methods
//! (`TxIndexingHandler::run`, `FinalityHandler::run`): receive, match,
//! dispatch, yield, repeat. Before its first receive it waits for the
//! cold-start barrier — the blockchain account funding signal — polling
//! every five seconds, since commands that touch the chain would otherwise
//! be processed before the node has anything to sign with.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use governance_bus::{BlockchainWritesGate, CommandReceiver, DeviceTokenCell, OutboundBus};
use governance_types::events::Command;
use tracing::{error, info};

use crate::cancellation;
use crate::ports::{AgreementStore, BlockchainAdapter};
use crate::registry_client::RegistryClient;

const COLD_START_POLL: Duration = Duration::from_secs(5);

pub struct CommandProcessor {
    pub commands: CommandReceiver,
    pub store: Arc<dyn AgreementStore>,
    pub blockchain: Arc<dyn BlockchainAdapter>,
    pub registry: Arc<dyn RegistryClient>,
    pub outbound: Arc<OutboundBus>,
    pub writes_gate: BlockchainWritesGate,
    pub device_token: DeviceTokenCell,
    pub device_id: String,
}

impl CommandProcessor {
    pub async fn run(mut self) {
        while !self.writes_gate.is_enabled() {
            tokio::time::sleep(COLD_START_POLL).await;
        }
        info!("blockchain writes enabled, command processor starting");

        loop {
            let Some(command) = self.commands.recv().await else {
                info!("command queue closed, command processor exiting");
                return;
            };
            self.dispatch(command).await;
            tokio::task::yield_now().await;
        }
    }

    pub async fn dispatch(&self, command: Command) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        match command {
            Command::DeviceRegistered { token } => {
                self.device_token.set(token).await;
            }

            Command::StartGovernExecution {
                agreement_id,
                deployment,
                ..
            } => {
                match self
                    .store
                    .set_execution_started(&agreement_id, deployment, now)
                    .await
                {
                    Ok(()) => governance_telemetry::record_agreement_executing(),
                    Err(e) => {
                        error!(agreement_id = %agreement_id, error = %e, "failed to record execution start");
                    }
                }
            }

            Command::CleanupExecution {
                agreement_id,
                protocol,
                reason,
                deployment,
            } => {
                let token = self.device_token.get().await;
                cancellation::cancel(
                    self.store.as_ref(),
                    self.registry.as_ref(),
                    self.blockchain.as_ref(),
                    &self.outbound,
                    &self.device_id,
                    &token,
                    &agreement_id,
                    protocol,
                    reason,
                    deployment,
                    now,
                )
                .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governance_bus::{command_queue, OutboundBus};
    use governance_types::entities::{AgreementId, AgreementProtocol, Deployment, EstablishedAgreement, Proposal, ProposalSig};

    use crate::ports::{InMemoryAgreementStore, NullBlockchainAdapter};
    use crate::registry_client::MockRegistryClient;

    fn established(id: &str) -> EstablishedAgreement {
        EstablishedAgreement {
            agreement_id: AgreementId::from(id),
            protocol: AgreementProtocol::BasicProducer,
            counter_party_address: "0xabc".to_string(),
            proposal: Proposal(vec![]),
            proposal_sig: ProposalSig(vec![]),
            creation_time: 10,
            accepted_time: 15,
            execution_start_time: 0,
            finalized_time: 0,
            terminated_time: 0,
            current_deployment: Deployment::new(),
            archived: false,
            on_chain_terminated: false,
        }
    }

    #[tokio::test]
    async fn start_govern_execution_records_deployment() {
        let (_tx, rx) = command_queue();
        let store = Arc::new(InMemoryAgreementStore::new());
        store.insert(established("a1")).await.unwrap();

        let processor = CommandProcessor {
            commands: rx,
            store: store.clone(),
            blockchain: Arc::new(NullBlockchainAdapter),
            registry: Arc::new(MockRegistryClient::new()),
            outbound: Arc::new(OutboundBus::new()),
            writes_gate: BlockchainWritesGate::new(),
            device_token: governance_bus::DeviceTokenCell::new(),
            device_id: "dev-1".to_string(),
        };

        processor
            .dispatch(Command::StartGovernExecution {
                agreement_id: AgreementId::from("a1"),
                protocol: AgreementProtocol::BasicProducer,
                deployment: Deployment::new(),
            })
            .await;

        let record = store.get(&AgreementId::from("a1")).await.unwrap().unwrap();
        assert!(record.execution_start_time > 0);
    }

    #[tokio::test]
    async fn device_registered_updates_the_token_cell() {
        let (_tx, rx) = command_queue();
        let device_token = governance_bus::DeviceTokenCell::new();
        let processor = CommandProcessor {
            commands: rx,
            store: Arc::new(InMemoryAgreementStore::new()),
            blockchain: Arc::new(NullBlockchainAdapter),
            registry: Arc::new(MockRegistryClient::new()),
            outbound: Arc::new(OutboundBus::new()),
            writes_gate: BlockchainWritesGate::new(),
            device_token: device_token.clone(),
            device_id: "dev-1".to_string(),
        };

        processor
            .dispatch(Command::DeviceRegistered {
                token: "tok-123".to_string(),
            })
            .await;

        assert_eq!(device_token.get().await, "tok-123");
    }

    #[tokio::test]
    async fn cleanup_execution_publishes_the_commands_own_deployment_not_the_stored_one() {
        let (_tx, rx) = command_queue();
        let store = Arc::new(InMemoryAgreementStore::new());
        let mut stored = established("a1");
        // A deployment left over in the store from a prior attempt, distinct
        // from what the triggering command itself reports.
        stored.current_deployment.insert(
            "stale".to_string(),
            governance_types::entities::ServiceConfig {
                name: "stale".to_string(),
                image_ref: "sha256:stale".to_string(),
                version: "0".to_string(),
            },
        );
        store.insert(stored).await.unwrap();

        let outbound = Arc::new(OutboundBus::new());
        let mut subscription = outbound.subscribe();
        let processor = CommandProcessor {
            commands: rx,
            store: store.clone(),
            blockchain: Arc::new(NullBlockchainAdapter),
            registry: Arc::new(MockRegistryClient::new()),
            outbound: outbound.clone(),
            writes_gate: BlockchainWritesGate::new(),
            device_token: governance_bus::DeviceTokenCell::new(),
            device_id: "dev-1".to_string(),
        };

        processor
            .dispatch(Command::CleanupExecution {
                agreement_id: AgreementId::from("a1"),
                protocol: AgreementProtocol::BasicProducer,
                reason: governance_types::entities::CancelReason::TorrentFailure,
                deployment: None,
            })
            .await;

        let event = subscription.recv().await.unwrap();
        let governance_types::events::OutboundEvent::GovernanceCancelation { deployment, .. } = event
        else {
            panic!("expected GovernanceCancelation");
        };
        assert!(
            deployment.is_none(),
            "TORRENT_FAILURE carries no deployment on the triggering command, \
             regardless of what the store happens to hold"
        );
    }
}
