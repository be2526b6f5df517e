//! # Inbound events, commands, and outbound events
//!
//! The three taxonomies that flow through the governance core, modeled one
//! enum per producer the way `governance_bus::events` models a single
//! choreography step per variant.

use serde::{Deserialize, Serialize};

use crate::entities::{AgreementId, AgreementProtocol, CancelReason, Deployment};

/// Events accepted by the event sink. Unknown/unrecognized inbound events
/// are dropped by the sink before they ever become one of these — there is
/// no `Other` variant here because the sink itself performs that
/// classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InboundEvent {
    /// Edge device registered (or re-registered) with the registry.
    EdgeRegistered { token: String },

    /// Container runtime reports an agreement's workload is running.
    ContainerExecutionBegun {
        agreement_id: AgreementId,
        protocol: AgreementProtocol,
        deployment: Deployment,
    },

    /// Container runtime reports a running workload failed.
    ContainerExecutionFailed {
        agreement_id: AgreementId,
        protocol: AgreementProtocol,
        deployment: Deployment,
    },

    /// The content-fetch (torrent) subsystem failed to retrieve an artifact.
    ContentFetchFailed {
        agreement_id: AgreementId,
        protocol: AgreementProtocol,
    },

    /// An internal component requested the agreement be ended.
    InternalCancellationRequested {
        agreement_id: AgreementId,
        protocol: AgreementProtocol,
        deployment: Deployment,
    },

    /// The external API requested the agreement be ended.
    ApiCancellationRequested {
        agreement_id: AgreementId,
        protocol: AgreementProtocol,
        deployment: Deployment,
    },

    /// The node's blockchain account was funded; on-chain writes may begin.
    AccountFunded,
}

/// Commands executed strictly sequentially by the command processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    /// Update the in-memory registry token used by outbound HTTP calls.
    DeviceRegistered { token: String },

    /// Mark an agreement's execution as started and record its deployment.
    StartGovernExecution {
        agreement_id: AgreementId,
        protocol: AgreementProtocol,
        deployment: Deployment,
    },

    /// Run the cancellation pipeline for an agreement and notify peers.
    CleanupExecution {
        agreement_id: AgreementId,
        protocol: AgreementProtocol,
        reason: CancelReason,
        deployment: Option<Deployment>,
    },
}

/// Events emitted to peer subsystems.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutboundEvent {
    /// Request that peers tear down the workload for a terminated agreement.
    GovernanceCancelation {
        agreement_id: AgreementId,
        protocol: AgreementProtocol,
        deployment: Option<Deployment>,
    },

    /// Liveness probe trigger for a running agreement.
    GovernanceMaintenance {
        agreement_id: AgreementId,
        protocol: AgreementProtocol,
        deployment: Deployment,
    },
}
