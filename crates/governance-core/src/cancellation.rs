//! The cancellation pipeline (C5): four best-effort steps, run from both the
//! command processor (C6) and the finalization loop (C3).
//!
//! Idempotence lives in the store's compare-and-set on `terminated_time`;
//! every step after it is allowed to fail independently and is logged, not
//! propagated, so one unreachable collaborator never blocks the others.

use std::sync::Arc;

use governance_bus::OutboundBus;
use governance_types::entities::{
    AgreementId, AgreementProtocol, CancelReason, Deployment, EstablishedAgreement,
};
use governance_types::events::OutboundEvent;
use tracing::{error, warn};

use crate::ports::{AgreementStore, BlockchainAdapter};
use crate::registry_client::RegistryClient;

/// The terminated-record snapshot produced by the pipeline's first step,
/// handed back so the caller can inspect the final persisted state (e.g.
/// the timestamp whichever racing call actually won the CAS recorded).
pub struct CancelOutcome {
    pub agreement: EstablishedAgreement,
}

/// Run the four-step pipeline for `id` and publish the resulting
/// cancellation event. Safe to call more than once for the same agreement:
/// the local terminate step CAS's `terminated_time`, so only the call that
/// wins the race sees its own `now`; every call still proceeds through
/// steps 2-4, but registry DELETE and archive are themselves idempotent and
/// step 3 is additionally guarded by `on_chain_terminated`, so repeat calls
/// degrade to cheap no-ops rather than errors.
///
/// `deployment` is published verbatim on the outbound
/// `GovernanceCancelation` event. Command-driven callers (C6) pass the
/// triggering command's own `deployment` field through unchanged — that's
/// `None` for `ContentFetchFailed`/`TORRENT_FAILURE`, since execution never
/// started and there is nothing to report, and `Some(..)` for every other
/// command. Loop-driven callers (C3) have no triggering command to draw
/// from and pass the store's own snapshot instead.
#[allow(clippy::too_many_arguments)]
pub async fn cancel(
    store: &dyn AgreementStore,
    registry: &dyn RegistryClient,
    blockchain: &dyn BlockchainAdapter,
    outbound: &Arc<OutboundBus>,
    device_id: &str,
    device_token: &str,
    id: &AgreementId,
    protocol: AgreementProtocol,
    reason: CancelReason,
    deployment: Option<Deployment>,
    now: u64,
) -> Option<CancelOutcome> {
    // Step 1: local terminate, CAS on terminated_time.
    let record = match store.terminate(id, now).await {
        Ok(record) => record,
        Err(e) => {
            error!(agreement_id = %id, error = %e, "cancellation pipeline: local terminate failed, aborting this attempt");
            return None;
        }
    };

    // Step 2: registry DELETE, 404 treated as success by the client.
    if let Err(e) = registry.delete_agreement(device_id, device_token, id).await {
        warn!(agreement_id = %id, error = %e, "cancellation pipeline: registry delete failed");
    }

    // Step 3: on-chain terminate. `claim_on_chain_terminate` is the
    // store's atomic check-and-flip on `on_chain_terminated`: at most one
    // racing caller is ever told it won the claim, so at most one call
    // ever reaches the adapter even though the call itself happens well
    // after this check returns.
    match store.claim_on_chain_terminate(id).await {
        Ok(true) => match record.proposal.producer_policy() {
            Ok(policy) => {
                if let Err(e) = blockchain
                    .terminate_agreement(&policy, &record.counter_party_address, id, reason)
                    .await
                {
                    warn!(agreement_id = %id, error = %e, "cancellation pipeline: on-chain terminate failed");
                }
            }
            Err(e) => {
                error!(agreement_id = %id, error = %e, "cancellation pipeline: proposal policy unparsable, skipping on-chain terminate");
            }
        },
        Ok(false) => {}
        Err(e) => {
            error!(agreement_id = %id, error = %e, "cancellation pipeline: failed to claim on-chain terminate");
        }
    }

    // Step 4: archive.
    if let Err(e) = store.archive(id).await {
        error!(agreement_id = %id, error = %e, "cancellation pipeline: archive failed");
    }

    outbound.publish(OutboundEvent::GovernanceCancelation {
        agreement_id: id.clone(),
        protocol,
        deployment,
    });
    if record.terminated_time == now {
        governance_telemetry::record_agreement_cancelled(&reason.to_string());
    }

    Some(CancelOutcome { agreement: record })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{InMemoryAgreementStore, NullBlockchainAdapter};
    use crate::registry_client::MockRegistryClient;
    use governance_types::entities::{Deployment, Proposal, ProposalSig};

    fn established(id: &str) -> EstablishedAgreement {
        EstablishedAgreement {
            agreement_id: AgreementId::from(id),
            protocol: AgreementProtocol::BasicProducer,
            counter_party_address: "0xabc".to_string(),
            proposal: Proposal(
                serde_json::json!({"services": [{"url": "spec://svc"}], "producer_policy": {}})
                    .to_string()
                    .into_bytes(),
            ),
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
    async fn cancel_sets_terminated_time_archives_and_publishes() {
        let store = InMemoryAgreementStore::new();
        store.insert(established("a1")).await.unwrap();
        let registry = MockRegistryClient::new();
        let blockchain = NullBlockchainAdapter;
        let outbound = Arc::new(OutboundBus::new());
        let mut subscription = outbound.subscribe();

        let id = AgreementId::from("a1");
        let outcome = cancel(
            &store,
            &registry,
            &blockchain,
            &outbound,
            "dev-1",
            "tok",
            &id,
            AgreementProtocol::BasicProducer,
            CancelReason::UserRequested,
            Some(Deployment::new()),
            100,
        )
        .await
        .unwrap();

        assert_eq!(outcome.agreement.terminated_time, 100);
        let record = store.get(&id).await.unwrap().unwrap();
        assert!(record.archived);
        assert_eq!(registry.calls().len(), 1);

        let event = subscription.recv().await.unwrap();
        assert!(matches!(
            event,
            OutboundEvent::GovernanceCancelation { deployment: Some(_), .. }
        ));
    }

    #[tokio::test]
    async fn cancel_publishes_no_deployment_when_the_command_carried_none() {
        let store = InMemoryAgreementStore::new();
        store.insert(established("a1")).await.unwrap();
        let registry = MockRegistryClient::new();
        let blockchain = NullBlockchainAdapter;
        let outbound = Arc::new(OutboundBus::new());
        let mut subscription = outbound.subscribe();
        let id = AgreementId::from("a1");

        cancel(
            &store,
            &registry,
            &blockchain,
            &outbound,
            "dev-1",
            "tok",
            &id,
            AgreementProtocol::BasicProducer,
            CancelReason::TorrentFailure,
            None,
            100,
        )
        .await
        .unwrap();

        let event = subscription.recv().await.unwrap();
        let OutboundEvent::GovernanceCancelation { deployment, .. } = event else {
            panic!("expected GovernanceCancelation");
        };
        assert!(deployment.is_none(), "TORRENT_FAILURE carries no deployment");
    }

    #[tokio::test]
    async fn double_cancel_does_not_move_terminated_time_or_double_archive() {
        let store = InMemoryAgreementStore::new();
        store.insert(established("a1")).await.unwrap();
        let registry = MockRegistryClient::new();
        let blockchain = NullBlockchainAdapter;
        let outbound = Arc::new(OutboundBus::new());
        let id = AgreementId::from("a1");

        cancel(
            &store, &registry, &blockchain, &outbound, "dev-1", "tok", &id,
            AgreementProtocol::BasicProducer, CancelReason::UserRequested, None, 100,
        )
        .await;
        let second = cancel(
            &store, &registry, &blockchain, &outbound, "dev-1", "tok", &id,
            AgreementProtocol::BasicProducer, CancelReason::UserRequested, None, 200,
        )
        .await
        .unwrap();

        assert_eq!(second.agreement.terminated_time, 100);
    }
}
