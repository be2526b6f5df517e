//! Production adapter for [`super::store::AgreementStore`] over `sled`.
//!
//! Swapped in over the teacher's RocksDB adapter: this core persists one
//! small table of agreement records keyed by id, not a multi-column-family
//! block store, so an embedded pure-Rust KV store is the better fit (see
//! `DESIGN.md`). `sled`'s API is synchronous; its operations are in-memory
//! page-cache writes backed by an async-friendly fsync thread, so calling it
//! directly from an `async fn` body without `spawn_blocking` is acceptable at
//! this core's call volume (one record touched per command or per loop
//! tick, never a bulk scan under load).
//!
//! `sled::Db` gives per-key atomicity but not a read-modify-write primitive
//! usable from plain `async fn` code, so every mutating method here takes
//! `write_lock` for its load-modify-store sequence. This is what makes
//! `terminate` and `claim_on_chain_terminate` genuine compare-and-swaps
//! rather than racing load/store pairs — the same guarantee
//! `InMemoryAgreementStore` gets for free from its single `tokio::sync::Mutex`.

use async_trait::async_trait;
use governance_types::entities::{AgreementId, Deployment, EstablishedAgreement};
use governance_types::errors::StoreError;
use tokio::sync::Mutex;

use super::store::{AgreementStore, ScanFilter};

pub struct SledAgreementStore {
    tree: sled::Db,
    write_lock: Mutex<()>,
}

impl SledAgreementStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, StoreError> {
        let tree = sled::open(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self {
            tree,
            write_lock: Mutex::new(()),
        })
    }

    fn load(&self, id: &AgreementId) -> Result<Option<EstablishedAgreement>, StoreError> {
        let Some(bytes) = self
            .tree
            .get(id.to_string().as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?
        else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&bytes).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Some(record))
    }

    fn store(&self, record: &EstablishedAgreement) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.tree
            .insert(record.agreement_id.to_string().as_bytes(), bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl AgreementStore for SledAgreementStore {
    async fn get(&self, id: &AgreementId) -> Result<Option<EstablishedAgreement>, StoreError> {
        self.load(id)
    }

    async fn insert(&self, agreement: EstablishedAgreement) -> Result<(), StoreError> {
        self.store(&agreement)
    }

    async fn scan(&self, filter: &ScanFilter) -> Result<Vec<EstablishedAgreement>, StoreError> {
        let mut out = Vec::new();
        for entry in self.tree.iter() {
            let (_, bytes) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            let record: EstablishedAgreement =
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Backend(e.to_string()))?;
            if filter(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    async fn set_execution_started(
        &self,
        id: &AgreementId,
        deployment: Deployment,
        now: u64,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.execution_start_time = now;
        record.current_deployment = deployment;
        self.store(&record)
    }

    async fn set_finalized(&self, id: &AgreementId, now: u64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.finalized_time = now;
        self.store(&record)
    }

    async fn terminate(
        &self,
        id: &AgreementId,
        now: u64,
    ) -> Result<EstablishedAgreement, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if record.terminated_time == 0 {
            record.terminated_time = now;
            self.store(&record)?;
        }
        Ok(record)
    }

    async fn claim_on_chain_terminate(&self, id: &AgreementId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if record.on_chain_terminated {
            return Ok(false);
        }
        record.on_chain_terminated = true;
        self.store(&record)?;
        Ok(true)
    }

    async fn archive(&self, id: &AgreementId) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load(id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.archived = true;
        self.store(&record)
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
    async fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledAgreementStore::open(dir.path()).unwrap();
        store.insert(fresh("a1")).await.unwrap();

        let id = AgreementId::from("a1");
        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.agreement_id, id);

        let terminated = store.terminate(&id, 999).await.unwrap();
        assert_eq!(terminated.terminated_time, 999);
        let reloaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(reloaded.terminated_time, 999);
    }
}
