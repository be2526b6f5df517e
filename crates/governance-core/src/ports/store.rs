//! The persistent agreement store port.
//!
//! Production: [`SledAgreementStore`]. Testing: [`InMemoryAgreementStore`].
//! Modeled on `qc-02-block-storage::ports::outbound::KeyValueStore`'s split
//! between a trait, an in-memory test double, and a production adapter —
//! generalized here to `async fn` since every call site in this core already
//! runs on a `tokio` task.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use governance_types::entities::{AgreementId, Deployment, EstablishedAgreement};
use governance_types::errors::StoreError;
use tokio::sync::Mutex;

/// A predicate used by [`AgreementStore::scan`] to select records without
/// the store having to know why the caller wants them.
pub type ScanFilter = dyn Fn(&EstablishedAgreement) -> bool + Send + Sync;

/// Abstract interface for the persisted agreement record set.
#[async_trait]
pub trait AgreementStore: Send + Sync {
    /// Fetch a single record.
    async fn get(&self, id: &AgreementId) -> Result<Option<EstablishedAgreement>, StoreError>;

    /// Insert a new record. Used by negotiation-side code and test fixtures;
    /// this core's own loops never create agreements, only read and
    /// transition them.
    async fn insert(&self, agreement: EstablishedAgreement) -> Result<(), StoreError>;

    /// Return every record for which `filter` returns `true`.
    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<EstablishedAgreement>, StoreError>;

    /// Record that execution has started and the deployment it started with.
    async fn set_execution_started(
        &self,
        id: &AgreementId,
        deployment: Deployment,
        now: u64,
    ) -> Result<(), StoreError>;

    /// Record that the agreement was observed on-chain and is finalized.
    async fn set_finalized(&self, id: &AgreementId, now: u64) -> Result<(), StoreError>;

    /// Compare-and-set `terminated_time`: if it is still `0`, set it to `now`
    /// and return the updated record; if it was already set, return the
    /// record unchanged. Either way the caller gets a snapshot to act on,
    /// making repeated calls for the same agreement idempotent.
    async fn terminate(
        &self,
        id: &AgreementId,
        now: u64,
    ) -> Result<EstablishedAgreement, StoreError>;

    /// Atomically claim the right to call the blockchain adapter's
    /// `terminate_agreement` for this agreement: if `on_chain_terminated`
    /// is still `false`, flips it to `true` and returns `true` (the caller
    /// won the claim and should make the call); otherwise returns `false`
    /// without mutating anything (another caller already claimed it,
    /// concurrently or on a prior attempt). The flip happens inside the
    /// same critical section as the check, so two racing callers can never
    /// both win — that's what keeps at most one on-chain terminate call
    /// reaching the adapter under concurrent cancellations, rather than
    /// relying on a read-then-write check split across an `await` point.
    async fn claim_on_chain_terminate(&self, id: &AgreementId) -> Result<bool, StoreError>;

    /// Mark the record archived, the terminal state.
    async fn archive(&self, id: &AgreementId) -> Result<(), StoreError>;
}

/// In-memory store for unit and scenario tests.
#[derive(Clone, Default)]
pub struct InMemoryAgreementStore {
    records: Arc<Mutex<HashMap<AgreementId, EstablishedAgreement>>>,
}

impl InMemoryAgreementStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgreementStore for InMemoryAgreementStore {
    async fn get(&self, id: &AgreementId) -> Result<Option<EstablishedAgreement>, StoreError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn insert(&self, agreement: EstablishedAgreement) -> Result<(), StoreError> {
        self.records
            .lock()
            .await
            .insert(agreement.agreement_id.clone(), agreement);
        Ok(())
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<EstablishedAgreement>, StoreError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|a| filter(a))
            .cloned()
            .collect())
    }

    async fn set_execution_started(
        &self,
        id: &AgreementId,
        deployment: Deployment,
        now: u64,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.execution_start_time = now;
        record.current_deployment = deployment;
        Ok(())
    }

    async fn set_finalized(&self, id: &AgreementId, now: u64) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.finalized_time = now;
        Ok(())
    }

    async fn terminate(
        &self,
        id: &AgreementId,
        now: u64,
    ) -> Result<EstablishedAgreement, StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if record.terminated_time == 0 {
            record.terminated_time = now;
        }
        Ok(record.clone())
    }

    async fn claim_on_chain_terminate(&self, id: &AgreementId) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if record.on_chain_terminated {
            return Ok(false);
        }
        record.on_chain_terminated = true;
        Ok(true)
    }

    async fn archive(&self, id: &AgreementId) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.archived = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governance_types::entities::{AgreementProtocol, Proposal, ProposalSig};

    fn fresh(id: &str) -> EstablishedAgreement {
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
    async fn terminate_is_idempotent() {
        let store = InMemoryAgreementStore::new();
        store.insert(fresh("a1")).await.unwrap();

        let id = AgreementId::from("a1");
        let first = store.terminate(&id, 100).await.unwrap();
        assert_eq!(first.terminated_time, 100);

        let second = store.terminate(&id, 200).await.unwrap();
        assert_eq!(second.terminated_time, 100, "a later call must not overwrite the first timestamp");
    }

    #[tokio::test]
    async fn scan_applies_the_given_filter() {
        let store = InMemoryAgreementStore::new();
        store.insert(fresh("a1")).await.unwrap();
        let mut other = fresh("a2");
        other.finalized_time = 50;
        store.insert(other).await.unwrap();

        let unfinalized = store
            .scan(&|a: &EstablishedAgreement| a.finalized_time == 0)
            .await
            .unwrap();
        assert_eq!(unfinalized.len(), 1);
        assert_eq!(unfinalized[0].agreement_id, AgreementId::from("a1"));
    }

    #[tokio::test]
    async fn set_execution_started_records_deployment() {
        let store = InMemoryAgreementStore::new();
        store.insert(fresh("a1")).await.unwrap();
        let id = AgreementId::from("a1");

        store
            .set_execution_started(&id, Deployment::new(), 42)
            .await
            .unwrap();
        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.execution_start_time, 42);
    }
}
