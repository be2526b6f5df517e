//! Test doubles and record builders shared across the scenario suite.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use governance_core::ports::BlockchainAdapter;
use governance_types::entities::{
    AgreementId, AgreementProtocol, CancelReason, Deployment, EstablishedAgreement, ProducerPolicy,
    Proposal, ProposalSig,
};
use governance_types::errors::AdapterError;

/// A blockchain adapter whose `verify_agreement_recorded` answer can be
/// flipped mid-test, and which counts how many times
/// `terminate_agreement` actually reached it — the thing scenario 6 (the
/// double-cancel race) needs to assert on.
#[derive(Clone, Default)]
pub struct ScriptedBlockchainAdapter {
    recorded: Arc<AtomicBool>,
    init_fails: Arc<AtomicBool>,
    terminate_calls: Arc<AtomicU64>,
    last_reason: Arc<Mutex<Option<CancelReason>>>,
}

impl ScriptedBlockchainAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_recorded(&self, value: bool) {
        self.recorded.store(value, Ordering::SeqCst);
    }

    pub fn set_init_fails(&self, value: bool) {
        self.init_fails.store(value, Ordering::SeqCst);
    }

    #[must_use]
    pub fn terminate_calls(&self) -> u64 {
        self.terminate_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_reason(&self) -> Option<CancelReason> {
        *self.last_reason.lock().unwrap()
    }
}

#[async_trait]
impl BlockchainAdapter for ScriptedBlockchainAdapter {
    async fn ensure_initialized(&self) -> Result<(), AdapterError> {
        if self.init_fails.load(Ordering::SeqCst) {
            Err(AdapterError::Unavailable("scripted init failure".to_string()))
        } else {
            Ok(())
        }
    }

    async fn verify_agreement_recorded(
        &self,
        _id: &AgreementId,
        _counterparty: &str,
        _sig: &ProposalSig,
    ) -> Result<bool, AdapterError> {
        Ok(self.recorded.load(Ordering::SeqCst))
    }

    async fn terminate_agreement(
        &self,
        _policy: &ProducerPolicy,
        _counterparty: &str,
        _id: &AgreementId,
        reason: CancelReason,
    ) -> Result<(), AdapterError> {
        self.terminate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_reason.lock().unwrap() = Some(reason);
        Ok(())
    }
}

/// A proposal with one declared service and an empty producer policy —
/// enough for both finalization's registry PUT and cancellation's on-chain
/// terminate to demarshal successfully.
#[must_use]
pub fn proposal_with_service(service_url: &str) -> Proposal {
    Proposal(
        serde_json::json!({
            "services": [{"url": service_url}],
            "producer_policy": {"id": "policy-1"},
        })
        .to_string()
        .into_bytes(),
    )
}

/// An accepted, unfinalized, unterminated agreement — the shape both
/// finalization-loop branches scan for.
#[must_use]
pub fn accepted_agreement(id: &str, creation_time: u64, accepted_time: u64) -> EstablishedAgreement {
    EstablishedAgreement {
        agreement_id: AgreementId::from(id),
        protocol: AgreementProtocol::BasicProducer,
        counter_party_address: "0xA".to_string(),
        proposal: proposal_with_service("spec://foo"),
        proposal_sig: ProposalSig(vec![1, 2, 3]),
        creation_time,
        accepted_time,
        execution_start_time: 0,
        finalized_time: 0,
        terminated_time: 0,
        current_deployment: Deployment::new(),
        archived: false,
        on_chain_terminated: false,
    }
}

/// An agreement already observed finalized on-chain.
#[must_use]
pub fn finalized_agreement(id: &str, accepted_time: u64, finalized_time: u64) -> EstablishedAgreement {
    let mut agreement = accepted_agreement(id, accepted_time.saturating_sub(5), accepted_time);
    agreement.finalized_time = finalized_time;
    agreement
}
