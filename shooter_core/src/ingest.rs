//! Update ingestion: validated messages from non-real-time producers are
//! published into the `Exchanges` the control tick reads.
//!
//! Producers either call `apply` directly or push through a bounded channel
//! drained by an `Ingestor` on its own thread. Neither path touches the
//! control thread; the tick only ever sees whole snapshots.

use crossbeam_channel as xch;
use shooter_config::messages::Message;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::ShooterError;
use crate::exchange::Exchanges;
use crate::types::{BlockConfig, Config, ShootCommand};

/// How long `Ingestor::pump` blocks before re-checking its shutdown flag.
const POLL: Duration = Duration::from_millis(20);

/// A validated update for one of the three exchanges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Update {
    Config(Config),
    Block(BlockConfig),
    Command(ShootCommand),
}

impl TryFrom<Message> for Update {
    type Error = ShooterError;

    fn try_from(m: Message) -> Result<Self, Self::Error> {
        match m {
            Message::Config(d) => {
                d.validate()
                    .map_err(|e| ShooterError::Update(e.to_string()))?;
                Ok(Update::Config(Config::from(&d)))
            }
            Message::Block(b) => {
                b.validate()
                    .map_err(|e| ShooterError::Update(e.to_string()))?;
                Ok(Update::Block(BlockConfig::from(&b)))
            }
            Message::Command(c) => Ok(Update::Command(ShootCommand::try_from(&c)?)),
        }
    }
}

/// Publish one update.
pub fn apply(exchanges: &Exchanges, update: Update) {
    match update {
        Update::Config(c) => {
            exchanges.config.publish(c);
            tracing::debug!(config = ?c, "config published");
        }
        Update::Block(b) => {
            exchanges.block.publish(b);
            tracing::debug!(block = ?b, "block config published");
        }
        Update::Command(c) => {
            exchanges.command.publish(c);
            tracing::trace!(command = ?c, "command published");
        }
    }
}

/// Decode, validate and publish one JSON message. Invalid messages leave
/// every exchange untouched.
pub fn apply_json(exchanges: &Exchanges, line: &str) -> Result<(), ShooterError> {
    let msg = shooter_config::messages::parse_message(line)
        .map_err(|e| ShooterError::Update(e.to_string()))?;
    apply(exchanges, Update::try_from(msg)?);
    Ok(())
}

/// Create a bounded update channel.
pub fn channel(capacity: usize) -> (UpdateSender, Ingestor) {
    let (tx, rx) = xch::bounded(capacity.max(1));
    (UpdateSender { tx }, Ingestor { rx })
}

#[derive(Debug, Clone)]
pub struct UpdateSender {
    tx: xch::Sender<Update>,
}

impl UpdateSender {
    /// Queue an update; blocks while the channel is full.
    pub fn send(&self, update: Update) -> Result<(), ShooterError> {
        self.tx
            .send(update)
            .map_err(|_| ShooterError::ChannelClosed)
    }

    /// Validate and queue a decoded message. Rejected messages are logged
    /// and never queued.
    pub fn send_message(&self, msg: Message) -> Result<(), ShooterError> {
        match Update::try_from(msg) {
            Ok(u) => self.send(u),
            Err(e) => {
                tracing::warn!(error = %e, "rejected update");
                Err(e)
            }
        }
    }
}

#[derive(Debug)]
pub struct Ingestor {
    rx: xch::Receiver<Update>,
}

impl Ingestor {
    /// Publish queued updates until `shutdown` is set or every sender is
    /// gone. Returns the number of updates applied.
    pub fn pump(&self, exchanges: &Exchanges, shutdown: &AtomicBool) -> u64 {
        let mut applied = 0;
        loop {
            if shutdown.load(Ordering::Relaxed) {
                tracing::debug!("ingestor received shutdown signal");
                break;
            }
            match self.rx.recv_timeout(POLL) {
                Ok(u) => {
                    apply(exchanges, u);
                    applied += 1;
                }
                Err(xch::RecvTimeoutError::Timeout) => {}
                Err(xch::RecvTimeoutError::Disconnected) => {
                    tracing::debug!("all update senders dropped");
                    break;
                }
            }
        }
        applied
    }

    /// Publish whatever is queued right now without blocking.
    pub fn drain(&self, exchanges: &Exchanges) -> u64 {
        let mut applied = 0;
        for u in self.rx.try_iter() {
            apply(exchanges, u);
            applied += 1;
        }
        applied
    }
}
