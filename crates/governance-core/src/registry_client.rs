//! The device registry HTTP client (C7).
//!
//! Elevated to a real dependency here since talking to the registry over
//! HTTP is this core's job, not an optional adapter. Retry/backoff
//! classification follows the teacher's tick-loop style of retrying on the
//! caller's own task rather than spawning a background retrier.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use governance_types::entities::AgreementId;
use governance_types::errors::RegistryError;
use reqwest::StatusCode;
use tracing::warn;

/// Delay between retries of a transient registry error. Unbounded: no
/// circuit breaker, matching the upstream behavior this core preserves
/// (see `DESIGN.md`'s Open Question decisions).
const RETRY_DELAY: Duration = Duration::from_secs(10);

#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// `PUT <exchange_url>/devices/<device_id>/agreements/<agreement_id>`
    /// with the microservice reference and a human-readable state label.
    /// Retries forever on a transient error.
    async fn put_agreement_state(
        &self,
        device_id: &str,
        token: &str,
        agreement_id: &AgreementId,
        microservice: &str,
        state_label: &str,
    ) -> Result<(), RegistryError>;

    /// `DELETE` the same resource. A `404` is treated as success: the
    /// record is already gone, which is the caller's desired end state.
    /// Retries forever on a transient error.
    async fn delete_agreement(
        &self,
        device_id: &str,
        token: &str,
        agreement_id: &AgreementId,
    ) -> Result<(), RegistryError>;
}

pub struct HttpRegistryClient {
    client: reqwest::Client,
    exchange_url: String,
}

impl HttpRegistryClient {
    #[must_use]
    pub fn new(exchange_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            exchange_url,
        }
    }

    fn agreement_url(&self, device_id: &str, agreement_id: &AgreementId) -> String {
        format!(
            "{}/devices/{device_id}/agreements/{agreement_id}",
            self.exchange_url.trim_end_matches('/'),
        )
    }

    fn classify(status: StatusCode) -> Option<RegistryError> {
        if status.is_success() {
            None
        } else if status.is_server_error() {
            Some(RegistryError::Transient(format!("server error: {status}")))
        } else {
            Some(RegistryError::Permanent(format!("rejected: {status}")))
        }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn put_agreement_state(
        &self,
        device_id: &str,
        token: &str,
        agreement_id: &AgreementId,
        microservice: &str,
        state_label: &str,
    ) -> Result<(), RegistryError> {
        let url = self.agreement_url(device_id, agreement_id);
        let body = serde_json::json!({
            "microservice": microservice,
            "state": state_label,
        });
        loop {
            let result = self
                .client
                .put(&url)
                .bearer_auth(token)
                .json(&body)
                .send()
                .await;
            match result {
                Ok(response) => match Self::classify(response.status()) {
                    None => {
                        governance_telemetry::record_registry_call("put_ok");
                        return Ok(());
                    }
                    Some(RegistryError::Transient(msg)) => {
                        governance_telemetry::record_registry_call("put_transient");
                        warn!(agreement_id = %agreement_id, error = %msg, "registry PUT transient failure, retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                    Some(err) => {
                        governance_telemetry::record_registry_call("put_permanent");
                        return Err(err);
                    }
                },
                Err(e) => {
                    governance_telemetry::record_registry_call("put_transient");
                    warn!(agreement_id = %agreement_id, error = %e, "registry PUT connect failure, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    async fn delete_agreement(
        &self,
        device_id: &str,
        token: &str,
        agreement_id: &AgreementId,
    ) -> Result<(), RegistryError> {
        let url = self.agreement_url(device_id, agreement_id);
        loop {
            let result = self.client.delete(&url).bearer_auth(token).send().await;
            match result {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    governance_telemetry::record_registry_call("delete_ok");
                    return Ok(());
                }
                Ok(response) => match Self::classify(response.status()) {
                    None => {
                        governance_telemetry::record_registry_call("delete_ok");
                        return Ok(());
                    }
                    Some(RegistryError::Transient(msg)) => {
                        governance_telemetry::record_registry_call("delete_transient");
                        warn!(agreement_id = %agreement_id, error = %msg, "registry DELETE transient failure, retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                    Some(err) => {
                        governance_telemetry::record_registry_call("delete_permanent");
                        return Err(err);
                    }
                },
                Err(e) => {
                    governance_telemetry::record_registry_call("delete_transient");
                    warn!(agreement_id = %agreement_id, error = %e, "registry DELETE connect failure, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
}

/// One recorded call, for scenario-test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Put {
        agreement_id: AgreementId,
        microservice: String,
        state_label: String,
    },
    Delete {
        agreement_id: AgreementId,
    },
}

/// In-memory recorder used by the scenario test suite. Never fails.
#[derive(Clone, Default)]
pub struct MockRegistryClient {
    calls: Arc<Mutex<Vec<RegistryCall>>>,
}

impl MockRegistryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryClient for MockRegistryClient {
    async fn put_agreement_state(
        &self,
        _device_id: &str,
        _token: &str,
        agreement_id: &AgreementId,
        microservice: &str,
        state_label: &str,
    ) -> Result<(), RegistryError> {
        self.calls.lock().unwrap().push(RegistryCall::Put {
            agreement_id: agreement_id.clone(),
            microservice: microservice.to_string(),
            state_label: state_label.to_string(),
        });
        Ok(())
    }

    async fn delete_agreement(
        &self,
        _device_id: &str,
        _token: &str,
        agreement_id: &AgreementId,
    ) -> Result<(), RegistryError> {
        self.calls.lock().unwrap().push(RegistryCall::Delete {
            agreement_id: agreement_id.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_put_then_delete_in_order() {
        let client = MockRegistryClient::new();
        let id = AgreementId::from("a1");
        client
            .put_agreement_state("dev-1", "tok", &id, "spec://svc", "Finalized Agreement")
            .await
            .unwrap();
        client.delete_agreement("dev-1", "tok", &id).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], RegistryCall::Put { .. }));
        assert!(matches!(calls[1], RegistryCall::Delete { .. }));
    }
}
