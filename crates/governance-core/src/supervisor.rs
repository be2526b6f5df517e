//! Wiring: constructs every component and spawns the three always-on tasks.
//!
//! Grounded in the teacher's `wiring::core_subsystems` / `container::subsystems`
//! pattern: one struct that owns the shared handles, one constructor, a
//! `spawn` method that hands back join handles for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use governance_bus::{command_queue, BlockchainWritesGate, DeviceTokenCell, OutboundBus};
use governance_types::events::InboundEvent;
use tokio::task::JoinHandle;

use crate::config::CoreConfig;
use crate::finalization::FinalizationLoop;
use crate::health::HealthLoop;
use crate::ports::{AgreementStore, BlockchainAdapter};
use crate::processor::CommandProcessor;
use crate::registry_client::RegistryClient;
use crate::sink::EventSink;

/// Same poll cadence the command processor uses to wait out the cold-start
/// barrier; C3 and C4 wait on the same gate before their first tick.
const COLD_START_POLL: Duration = Duration::from_secs(5);

async fn wait_for_writes_gate(gate: &BlockchainWritesGate) {
    while !gate.is_enabled() {
        tokio::time::sleep(COLD_START_POLL).await;
    }
}

/// Owns the wiring between the event sink, the command processor, and the
/// two periodic loops. Construct once at startup; [`GovernanceCore::spawn`]
/// starts the background tasks and returns their join handles.
pub struct GovernanceCore {
    pub sink: EventSink,
    processor: Option<CommandProcessor>,
    finalization: Option<FinalizationLoop>,
    health: Option<HealthLoop>,
    writes_gate: BlockchainWritesGate,
    pub outbound: Arc<OutboundBus>,
}

impl GovernanceCore {
    #[must_use]
    pub fn new(
        config: &CoreConfig,
        store: Arc<dyn AgreementStore>,
        blockchain: Arc<dyn BlockchainAdapter>,
        registry: Arc<dyn RegistryClient>,
    ) -> Self {
        let (command_tx, command_rx) = command_queue();
        let writes_gate = BlockchainWritesGate::new();
        let device_token = DeviceTokenCell::new();
        let outbound = Arc::new(OutboundBus::new());

        let sink = EventSink::new(command_tx, writes_gate.clone());

        let processor = CommandProcessor {
            commands: command_rx,
            store: store.clone(),
            blockchain: blockchain.clone(),
            registry: registry.clone(),
            outbound: outbound.clone(),
            writes_gate: writes_gate.clone(),
            device_token: device_token.clone(),
            device_id: config.device_id.clone(),
        };

        let finalization = FinalizationLoop {
            store: store.clone(),
            blockchain: blockchain.clone(),
            registry: registry.clone(),
            outbound: outbound.clone(),
            device_id: config.device_id.clone(),
            device_token,
            agreement_timeout_s: config.agreement_timeout_s,
        };

        let health = HealthLoop {
            store,
            outbound: outbound.clone(),
        };

        Self {
            sink,
            processor: Some(processor),
            finalization: Some(finalization),
            health: Some(health),
            writes_gate,
            outbound,
        }
    }

    /// Feed one inbound event through the sink. Call this from whatever
    /// glue code receives events from adjacent subsystems.
    pub async fn handle_inbound(&self, event: InboundEvent) {
        self.sink.handle(event).await;
    }

    /// Start the command processor and both periodic loops as independent
    /// tasks. Consumes the stored components — call once.
    pub fn spawn(&mut self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(3);
        if let Some(processor) = self.processor.take() {
            handles.push(tokio::spawn(processor.run()));
        }
        if let Some(finalization) = self.finalization.take() {
            let gate = self.writes_gate.clone();
            handles.push(tokio::spawn(async move {
                wait_for_writes_gate(&gate).await;
                finalization.run().await;
            }));
        }
        if let Some(health) = self.health.take() {
            let gate = self.writes_gate.clone();
            handles.push(tokio::spawn(async move {
                wait_for_writes_gate(&gate).await;
                health.run().await;
            }));
        }
        handles
    }
}
