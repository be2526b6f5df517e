//! End-to-end scenario coverage for the lifecycle: happy-path finalization,
//! the two timeout paths, on-chain discovery, container-failure
//! cancellation, and a concurrent double-cancel race. Plus two
//! cross-cutting checks that don't fit neatly under a single scenario:
//! that both periodic loops ignore agreements without a counterparty yet,
//! and that the command processor holds every command until the
//! cold-start barrier lifts.
