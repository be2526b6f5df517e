//! # Error Types
//!
//! Errors that cross the governance core's port boundaries, split by
//! collaborator.

use thiserror::Error;

/// Errors surfaced by the persistent agreement store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("agreement not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors parsing a proposal or its embedded policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProposalError {
    #[error("malformed proposal: {0}")]
    Malformed(String),

    #[error("proposal declares no services")]
    NoServices,

    #[error("unrecognized agreement protocol: {0}")]
    UnrecognizedProtocol(String),
}

/// Errors surfaced by the blockchain adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("blockchain adapter unavailable: {0}")]
    Unavailable(String),

    #[error("blockchain RPC error: {0}")]
    Rpc(String),

    #[error("blockchain contract bindings not initialized")]
    NotInitialized,
}

/// Errors from the registry HTTP client, split by whether a retry can help.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Bad request, auth failure, or a response the client cannot make
    /// sense of. Retrying will not change the outcome.
    #[error("permanent registry error: {0}")]
    Permanent(String),

    /// Connect/timeout/5xx. Callers retry after a fixed delay, unbounded.
    #[error("transient registry error: {0}")]
    Transient(String),
}
