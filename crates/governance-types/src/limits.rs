//! Fixed timing limits consulted by the governance core's loops.
//!
//! These are compile-time constants rather than a config struct field
//! because none of them has ever needed to vary across deployments; if that
//! changes, promote the one that needs it into `CoreConfig`.

/// Minutes an agreement may sit accepted-but-not-executing before the
/// finalization loop cancels it for `NotExecutedTimeout`.
pub const MAX_PRELAUNCH_M: u64 = 60;

/// Minutes an agreement may sit unconfigured (no deployment recorded) before
/// it would be a candidate for cleanup. Reserved: no loop in this core
/// consults it yet.
#[allow(dead_code)]
pub const MAX_UNCONFIGURED_M: u64 = 20;

/// Minutes a running agreement may go without a funded account before it
/// would be a candidate for cleanup. Reserved: no loop in this core
/// consults it yet.
#[allow(dead_code)]
pub const MAX_UNPAID_RUN_M: u64 = 60;

/// Minutes a proposed agreement may wait for counterparty acceptance before
/// it would be a candidate for cleanup. Reserved: no loop in this core
/// consults it yet.
#[allow(dead_code)]
pub const MAX_ACCEPTANCE_WAIT_M: u64 = 20;
