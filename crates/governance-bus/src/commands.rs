//! # Command Queue
//!
//! The serialization point between the event sink and the command
//! processor: every `Command` the sink derives from an `InboundEvent` is
//! pushed here and drained strictly in order by one processor task, so two
//! commands touching the same agreement never race each other.

use governance_types::events::Command;
use tokio::sync::mpsc;

/// Bounded so a stalled processor applies backpressure to the sink rather
/// than growing memory without limit.
pub const COMMAND_QUEUE_CAPACITY: usize = 200;

#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<Command>,
}

impl CommandSender {
    pub async fn send(&self, command: Command) -> Result<(), mpsc::error::SendError<Command>> {
        self.tx.send(command).await
    }
}

pub struct CommandReceiver {
    rx: mpsc::Receiver<Command>,
}

impl CommandReceiver {
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }
}

#[must_use]
pub fn command_queue() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    (CommandSender { tx }, CommandReceiver { rx })
}
