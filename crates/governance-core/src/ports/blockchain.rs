//! The blockchain adapter port.
//!
//! Out of scope per this core's charter: it only consumes this interface,
//! never re-implements a chain client. Shape mirrors
//! [`super::store::AgreementStore`] — trait, a null test double, and a thin
//! production shim.

use async_trait::async_trait;
use governance_types::entities::{AgreementId, CancelReason, ProducerPolicy};
use governance_types::errors::AdapterError;

/// Abstract interface for the on-chain agreement contract.
#[async_trait]
pub trait BlockchainAdapter: Send + Sync {
    /// One-time setup (binding the contract instance, resolving an ABI,
    /// whatever the concrete chain client needs). Called once by the
    /// finalization loop before its first tick; a failure here is expected
    /// to leave that loop permanently inert rather than retried — see the
    /// finalization loop's doc comment.
    async fn ensure_initialized(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Ask the chain whether `id` is recorded as agreed between this node
    /// and `counterparty`, verifying `sig` over the proposal.
    async fn verify_agreement_recorded(
        &self,
        id: &AgreementId,
        counterparty: &str,
        sig: &governance_types::entities::ProposalSig,
    ) -> Result<bool, AdapterError>;

    /// Issue the on-chain terminate call for `id`, carrying `reason` and the
    /// demarshalled producer policy from its proposal.
    async fn terminate_agreement(
        &self,
        policy: &ProducerPolicy,
        counterparty: &str,
        id: &AgreementId,
        reason: CancelReason,
    ) -> Result<(), AdapterError>;
}

/// Always reports the agreement as unrecorded and accepts every terminate
/// call without doing anything. Used in unit tests and wherever a core is
/// wired up before a real chain client is available.
#[derive(Debug, Default)]
pub struct NullBlockchainAdapter;

#[async_trait]
impl BlockchainAdapter for NullBlockchainAdapter {
    async fn verify_agreement_recorded(
        &self,
        _id: &AgreementId,
        _counterparty: &str,
        _sig: &governance_types::entities::ProposalSig,
    ) -> Result<bool, AdapterError> {
        Ok(false)
    }

    async fn terminate_agreement(
        &self,
        _policy: &ProducerPolicy,
        _counterparty: &str,
        _id: &AgreementId,
        _reason: CancelReason,
    ) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Production shim: a thin JSON-RPC client over `reqwest`. The wire format
/// of the real chain client is out of scope, so this only shapes the two
/// calls this core actually issues.
pub struct JsonRpcBlockchainAdapter {
    client: reqwest::Client,
    geth_url: String,
}

impl JsonRpcBlockchainAdapter {
    #[must_use]
    pub fn new(geth_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            geth_url,
        }
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, AdapterError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.geth_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Rpc(e.to_string()))?;
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdapterError::Rpc(e.to_string()))?;
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| AdapterError::Rpc("missing result field".to_string()))
    }
}

#[async_trait]
impl BlockchainAdapter for JsonRpcBlockchainAdapter {
    async fn verify_agreement_recorded(
        &self,
        id: &AgreementId,
        counterparty: &str,
        sig: &governance_types::entities::ProposalSig,
    ) -> Result<bool, AdapterError> {
        let result = self
            .call(
                "governance_verifyAgreement",
                serde_json::json!({
                    "agreementId": id.to_string(),
                    "counterparty": counterparty,
                    "signature": hex::encode(&sig.0),
                }),
            )
            .await?;
        result
            .as_bool()
            .ok_or_else(|| AdapterError::Rpc("expected boolean result".to_string()))
    }

    async fn terminate_agreement(
        &self,
        policy: &ProducerPolicy,
        counterparty: &str,
        id: &AgreementId,
        reason: CancelReason,
    ) -> Result<(), AdapterError> {
        self.call(
            "governance_terminateAgreement",
            serde_json::json!({
                "agreementId": id.to_string(),
                "counterparty": counterparty,
                "reasonCode": reason.code(),
                "policy": policy.0,
            }),
        )
        .await?;
        Ok(())
    }
}
