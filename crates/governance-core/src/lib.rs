//! # Agreement Governance Core
//!
//! The supervisor that brokers, runs, and polices edge-node compute
//! agreements: reacts to lifecycle events from adjacent subsystems (C1),
//! drives every established agreement through its state machine on a
//! strictly-serial command processor (C2/C6), detects on-chain discovery
//! and timeout conditions on a periodic scan (C3), emits liveness probes
//! for running agreements (C4), and runs an idempotent multi-stage
//! cancellation pipeline (C5) backed by a registry HTTP client (C7).

pub mod cancellation;
pub mod config;
pub mod finalization;
pub mod health;
pub mod ports;
pub mod processor;
pub mod registry_client;
pub mod sink;
pub mod supervisor;

pub use config::CoreConfig;
pub use supervisor::GovernanceCore;
