//! # Governance Bus
//!
//! The channels and shared cells that connect the governance core's
//! components without letting them call each other directly:
//!
//! - [`commands`] — the bounded queue between the sink and the command
//!   processor.
//! - [`outbound`] — the broadcast bus peer subsystems subscribe to.
//! - [`shared`] — the two small pieces of state every loop reads.
//!
//! The event sink itself has no intake channel of its own: per the
//! governance core's concurrency model, C1 runs on the caller's own task
//! (`GovernanceCore::handle_inbound` calls `EventSink::handle` directly), so
//! there is no inbound queue to hand events through before they reach it.

pub mod commands;
pub mod outbound;
pub mod outbound_subscription;
pub mod shared;

pub use commands::{command_queue, CommandReceiver, CommandSender, COMMAND_QUEUE_CAPACITY};
pub use outbound::{OutboundBus, DEFAULT_OUTBOUND_CAPACITY};
pub use outbound_subscription::OutboundSubscription;
pub use shared::{BlockchainWritesGate, DeviceTokenCell};
