//! # Core Domain Entities
//!
//! Defines the established-agreement record and the values that flow through
//! it.
//!
//! ## Clusters
//!
//! - **Identity**: `AgreementId`, `AgreementProtocol`.
//! - **Lifecycle**: `EstablishedAgreement` and its timestamps.
//! - **Deployment**: `ServiceConfig`, the `Deployment` map.
//! - **Cancellation**: `CancelReason`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ProposalError;

/// Opaque stable identifier for an established agreement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgreementId(pub String);

impl fmt::Display for AgreementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgreementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Selector for the negotiation protocol used to reach an agreement.
///
/// There is exactly one recognized value today; the enum still exists
/// (rather than a bare constant) so a second protocol can be added without
/// widening every signature that carries a protocol value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgreementProtocol {
    /// The only protocol this core negotiates today.
    BasicProducer,
}

impl fmt::Display for AgreementProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BasicProducer => write!(f, "Basic"),
        }
    }
}

impl FromStr for AgreementProtocol {
    type Err = ProposalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Basic" => Ok(Self::BasicProducer),
            other => Err(ProposalError::UnrecognizedProtocol(other.to_string())),
        }
    }
}

/// A single container/service entry within a negotiated deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service/container name, used as the deployment map key too.
    pub name: String,
    /// Content-addressed reference the fetch subsystem resolved.
    pub image_ref: String,
    /// Service specification version.
    pub version: String,
}

/// Mapping from container/service name to its configuration, populated at
/// execution start.
pub type Deployment = BTreeMap<String, ServiceConfig>;

/// Cancellation reason codes transmitted on-chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum CancelReason {
    NotFinalizedTimeout = 100,
    /// Reserved for forward compatibility — no loop in this core raises it
    /// yet.
    PolicyChanged = 101,
    TorrentFailure = 102,
    ContainerFailure = 103,
    NotExecutedTimeout = 104,
    UserRequested = 105,
    Discovered = 106,
}

impl CancelReason {
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFinalizedTimeout => "NOT_FINALIZED_TIMEOUT",
            Self::PolicyChanged => "POLICY_CHANGED",
            Self::TorrentFailure => "TORRENT_FAILURE",
            Self::ContainerFailure => "CONTAINER_FAILURE",
            Self::NotExecutedTimeout => "NOT_EXECUTED_TIMEOUT",
            Self::UserRequested => "USER_REQUESTED",
            Self::Discovered => "DISCOVERED",
        };
        write!(f, "{name}")
    }
}

impl TryFrom<u16> for CancelReason {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            100 => Ok(Self::NotFinalizedTimeout),
            101 => Ok(Self::PolicyChanged),
            102 => Ok(Self::TorrentFailure),
            103 => Ok(Self::ContainerFailure),
            104 => Ok(Self::NotExecutedTimeout),
            105 => Ok(Self::UserRequested),
            106 => Ok(Self::Discovered),
            other => Err(other),
        }
    }
}

/// A serialized proposal. Opaque to this core except for the small envelope
/// parsed in [`Proposal::service_specs`] to recover the first declared
/// service spec and the embedded producer policy reference. The policy
/// language itself is out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal(pub Vec<u8>);

/// Signature over a [`Proposal`], opaque to this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSig(pub Vec<u8>);

/// Minimal envelope this core demarshals out of a proposal: enough to PUT a
/// registry state record and to hand a producer policy to the blockchain
/// adapter on termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProposalEnvelope {
    services: Vec<ServiceSpecRef>,
    producer_policy: serde_json::Value,
}

/// A reference to one declared service specification within a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpecRef {
    /// `spec://...`-style reference used as the registry `microservice` field.
    pub url: String,
}

/// The producer-side policy handed to the blockchain adapter on termination;
/// opaque beyond what `terminate_agreement` needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerPolicy(pub serde_json::Value);

impl Proposal {
    /// Parse the proposal envelope and return its declared service specs, in
    /// declaration order, plus the embedded producer policy.
    ///
    /// Reduced to a small JSON envelope since the policy language itself is
    /// out of scope.
    pub fn service_specs(&self) -> Result<(Vec<ServiceSpecRef>, ProducerPolicy), ProposalError> {
        let envelope: ProposalEnvelope = serde_json::from_slice(&self.0)
            .map_err(|e| ProposalError::Malformed(e.to_string()))?;
        Ok((envelope.services, ProducerPolicy(envelope.producer_policy)))
    }

    /// The first declared service specification.
    pub fn first_service_spec(&self) -> Result<ServiceSpecRef, ProposalError> {
        let (services, _) = self.service_specs()?;
        services.into_iter().next().ok_or(ProposalError::NoServices)
    }

    /// The producer policy alone, used by the cancellation pipeline.
    pub fn producer_policy(&self) -> Result<ProducerPolicy, ProposalError> {
        let (_, policy) = self.service_specs()?;
        Ok(policy)
    }
}

/// An established agreement record, as persisted by the store.
///
/// Timestamps are seconds since epoch; `0` means unset. See
/// [`EstablishedAgreement::check_invariants`] for the monotonicity rule this
/// type is expected to uphold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstablishedAgreement {
    pub agreement_id: AgreementId,
    pub protocol: AgreementProtocol,
    pub counter_party_address: String,
    pub proposal: Proposal,
    pub proposal_sig: ProposalSig,

    pub creation_time: u64,
    pub accepted_time: u64,
    pub execution_start_time: u64,
    pub finalized_time: u64,
    pub terminated_time: u64,

    pub current_deployment: Deployment,
    pub archived: bool,

    /// Local guard against a duplicate on-chain `TerminateAgreement` call —
    /// the adapter itself is not assumed to be idempotent.
    pub on_chain_terminated: bool,
}

impl EstablishedAgreement {
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.archived
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated_time != 0
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized_time != 0
    }

    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.execution_start_time != 0
    }

    /// True once the counterparty has accepted, i.e. once
    /// `counter_party_address` is no longer empty.
    #[must_use]
    pub fn has_counterparty(&self) -> bool {
        !self.counter_party_address.is_empty()
    }

    /// Checks the monotone-timestamp invariant, including the
    /// early-cancellation exception: `terminated_time` may be nonzero while
    /// `execution_start_time` and/or `finalized_time` remain zero.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.accepted_time != 0 && self.creation_time == 0 {
            return Err(InvariantViolation {
                message: "accepted_time set but creation_time is unset".to_string(),
            });
        }
        if self.terminated_time == 0 {
            if self.execution_start_time != 0 && self.accepted_time == 0 {
                return Err(InvariantViolation {
                    message: "execution_start_time set but accepted_time is unset".to_string(),
                });
            }
            if self.finalized_time != 0 && self.accepted_time == 0 {
                return Err(InvariantViolation {
                    message: "finalized_time set but accepted_time is unset".to_string(),
                });
            }
        }
        if self.archived && self.terminated_time == 0 {
            return Err(InvariantViolation {
                message: "archived but never terminated".to_string(),
            });
        }
        Ok(())
    }
}

/// A monotonicity violation, returned by
/// [`EstablishedAgreement::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub message: String,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agreement invariant violated: {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_agreement() -> EstablishedAgreement {
        EstablishedAgreement {
            agreement_id: AgreementId::from("a1"),
            protocol: AgreementProtocol::BasicProducer,
            counter_party_address: String::new(),
            proposal: Proposal(vec![]),
            proposal_sig: ProposalSig(vec![]),
            creation_time: 0,
            accepted_time: 0,
            execution_start_time: 0,
            finalized_time: 0,
            terminated_time: 0,
            current_deployment: Deployment::new(),
            archived: false,
            on_chain_terminated: false,
        }
    }

    #[test]
    fn cancel_reason_round_trips_through_u16() {
        for reason in [
            CancelReason::NotFinalizedTimeout,
            CancelReason::PolicyChanged,
            CancelReason::TorrentFailure,
            CancelReason::ContainerFailure,
            CancelReason::NotExecutedTimeout,
            CancelReason::UserRequested,
            CancelReason::Discovered,
        ] {
            assert_eq!(CancelReason::try_from(reason.code()), Ok(reason));
        }
        assert_eq!(CancelReason::try_from(999), Err(999));
    }

    #[test]
    fn invariants_hold_for_fresh_agreement() {
        let agreement = base_agreement();
        assert!(agreement.check_invariants().is_ok());
        assert!(!agreement.has_counterparty());
    }

    #[test]
    fn invariants_reject_execution_without_acceptance() {
        let mut agreement = base_agreement();
        agreement.creation_time = 10;
        agreement.execution_start_time = 20;
        assert!(agreement.check_invariants().is_err());
    }

    #[test]
    fn early_termination_is_allowed_before_execution_and_finalization() {
        let mut agreement = base_agreement();
        agreement.creation_time = 10;
        agreement.accepted_time = 15;
        agreement.terminated_time = 16;
        assert!(agreement.check_invariants().is_ok());
    }

    #[test]
    fn proposal_parses_first_service_spec() {
        let proposal = Proposal(
            serde_json::json!({
                "services": [{"url": "spec://foo"}, {"url": "spec://bar"}],
                "producer_policy": {"id": "p1"}
            })
            .to_string()
            .into_bytes(),
        );
        let spec = proposal.first_service_spec().unwrap();
        assert_eq!(spec.url, "spec://foo");
    }

    #[test]
    fn proposal_with_no_services_errs() {
        let proposal = Proposal(
            serde_json::json!({"services": [], "producer_policy": {}})
                .to_string()
                .into_bytes(),
        );
        assert!(matches!(
            proposal.first_service_spec(),
            Err(ProposalError::NoServices)
        ));
    }
}
