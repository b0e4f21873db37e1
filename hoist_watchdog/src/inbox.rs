//! Everything the watchdog reacts to, funnelled into one tokio channel.
//!
//! FIFO reads block, so each control channel gets a dedicated OS thread that
//! forwards decoded messages with `blocking_send`.

use hoist_common::channel::{ChannelError, ChannelReader};
use hoist_common::prelude::*;
use std::io;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const INBOX_CAPACITY: usize = 64;

/// One event for the watchdog cycle.
#[derive(Debug)]
pub enum Inbound {
    /// A control message from a peer.
    Control { from: Role, msg: ControlMessage },
    /// Identities of the replacement motors after an emergency stop.
    Resynced(AxisMap<Identity>),
    /// The motor handshake after an emergency stop failed.
    ResyncFailed(ChannelError),
    /// A control channel can no longer be read.
    PumpFailed { from: Role, error: ChannelError },
}

/// Receiving end plus a sender template.
#[derive(Debug)]
pub struct Inbox {
    tx: mpsc::Sender<Inbound>,
    rx: mpsc::Receiver<Inbound>,
}

impl Inbox {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        Self { tx, rx }
    }

    pub fn sender(&self) -> mpsc::Sender<Inbound> {
        self.tx.clone()
    }

    pub async fn recv(&mut self) -> Option<Inbound> {
        self.rx.recv().await
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward every message read from `reader` into the inbox.
///
/// Malformed records are skipped. The thread ends after reporting a fatal
/// read error or when the inbox is gone.
pub fn spawn_pump(
    from: Role,
    mut reader: ChannelReader<ControlMessage>,
    tx: mpsc::Sender<Inbound>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("pump-{}", from.slug()))
        .spawn(move || {
            loop {
                let (event, last) = match reader.recv() {
                    Ok(msg) => (Inbound::Control { from, msg }, false),
                    Err(e) if !e.is_fatal() => {
                        warn!("Dropping control record from {from}: {e}");
                        continue;
                    }
                    Err(error) => (Inbound::PumpFailed { from, error }, true),
                };
                if tx.blocking_send(event).is_err() || last {
                    debug!("Pump for {from} stopped");
                    return;
                }
            }
        })
}
