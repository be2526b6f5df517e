//! The event sink (C1): classifies inbound events into commands for the
//! serial processor, or applies a direct state flip itself.
//!
//! Runs on the calling task — whichever adjacent subsystem delivers the
//! event pays for its own classification cost. Never touches the store,
//! matching the teacher's `TxIndexingHandler`-style receive/dispatch split
//! where the dispatching half stays cheap and I/O-free.

use governance_bus::shared::BlockchainWritesGate;
use governance_bus::CommandSender;
use governance_types::entities::CancelReason;
use governance_types::events::{Command, InboundEvent};
use tracing::{debug, error};

pub struct EventSink {
    commands: CommandSender,
    writes_gate: BlockchainWritesGate,
}

impl EventSink {
    #[must_use]
    pub fn new(commands: CommandSender, writes_gate: BlockchainWritesGate) -> Self {
        Self {
            commands,
            writes_gate,
        }
    }

    pub async fn handle(&self, event: InboundEvent) {
        let command = match event {
            InboundEvent::EdgeRegistered { token } => Command::DeviceRegistered { token },

            InboundEvent::ContainerExecutionBegun {
                agreement_id,
                protocol,
                deployment,
            } => Command::StartGovernExecution {
                agreement_id,
                protocol,
                deployment,
            },

            InboundEvent::ContainerExecutionFailed {
                agreement_id,
                protocol,
                deployment,
            } => Command::CleanupExecution {
                agreement_id,
                protocol,
                reason: CancelReason::ContainerFailure,
                deployment: Some(deployment),
            },

            InboundEvent::ContentFetchFailed {
                agreement_id,
                protocol,
            } => Command::CleanupExecution {
                agreement_id,
                protocol,
                reason: CancelReason::TorrentFailure,
                deployment: None,
            },

            InboundEvent::InternalCancellationRequested {
                agreement_id,
                protocol,
                deployment,
            }
            | InboundEvent::ApiCancellationRequested {
                agreement_id,
                protocol,
                deployment,
            } => Command::CleanupExecution {
                agreement_id,
                protocol,
                reason: CancelReason::UserRequested,
                deployment: Some(deployment),
            },

            InboundEvent::AccountFunded => {
                debug!("blockchain account funded, enabling on-chain writes");
                self.writes_gate.enable();
                return;
            }
        };

        if let Err(e) = self.commands.send(command).await {
            error!(error = %e, "command queue closed, dropping command");
        }
    }
}
