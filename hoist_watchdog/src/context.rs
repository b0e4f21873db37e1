//! Watchdog boot handshake and the dead-man cycle.

use crate::deadman::DeadManSwitch;
use crate::inbox::{Inbound, Inbox, spawn_pump};
use hoist_common::channel::identity;
use hoist_common::channel::{
    ChannelDirectory, ChannelError, ChannelReader, ChannelResult, ChannelWriter,
};
use hoist_common::config::HoistConfig;
use hoist_common::prelude::*;
use std::io;
use std::thread;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, info, warn};

/// Fatal watchdog failures.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("failed to start worker thread: {0}")]
    Thread(#[source] io::Error),

    #[error("handshake worker exited without a result")]
    HandshakeAborted,

    #[error("control inbox closed")]
    InboxClosed,

    #[error("control channel from {from} failed: {source}")]
    Pump {
        from: Role,
        #[source]
        source: ChannelError,
    },

    #[error("motor resync failed: {0}")]
    Resync(#[source] ChannelError),
}

/// Whether the cycle continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Where forced resets go.
pub trait ResetSink {
    fn forced_reset(&mut self) -> ChannelResult<()>;
}

impl ResetSink for ChannelWriter<ControlMessage> {
    fn forced_reset(&mut self) -> ChannelResult<()> {
        self.send(&ControlMessage::ForcedReset)
    }
}

/// Identities of the supervised peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roster {
    pub inspector: Identity,
    pub motors: AxisMap<Identity>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogStats {
    pub pings: u64,
    pub forced_resets: u64,
    pub emergencies: u64,
}

/// Run `f` on a detached OS thread.
///
/// Detached so that a handshake stuck on a missing peer never holds up
/// runtime shutdown.
fn off_runtime<T, F>(name: String, f: F) -> Result<oneshot::Receiver<T>, WatchdogError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            let _ = tx.send(f());
        })
        .map_err(WatchdogError::Thread)?;
    Ok(rx)
}

/// Everything the watchdog process owns.
pub struct WatchdogContext<S: ResetSink> {
    dir: ChannelDirectory,
    switch: DeadManSwitch,
    sink: S,
    inbox: Inbox,
    roster: Roster,
    resync_pending: bool,
    stats: WatchdogStats,
}

impl WatchdogContext<ChannelWriter<ControlMessage>> {
    /// Full boot sequence.
    ///
    /// 1. Open the inbound control channels and start their pumps.
    /// 2. Publish our identity to commander, inspector and both motors, concurrently.
    /// 3. Acquire the inspector identity, then motor X, then motor Z.
    /// 4. Open the forced-reset channel to the inspector.
    pub async fn boot(config: &HoistConfig) -> Result<Self, WatchdogError> {
        let dir = ChannelDirectory::new(&config.paths.channel_dir);
        dir.prepare()?;

        let inbox = Inbox::new();
        for from in [Role::Commander, Role::Inspector] {
            let reader = ChannelReader::open(dir.control(Role::Watchdog, from))?;
            spawn_pump(from, reader, inbox.sender()).map_err(WatchdogError::Thread)?;
        }
        info!("Control channels open");

        let own = Identity::current();
        let peers = [
            Role::Commander,
            Role::Inspector,
            Role::Motor(Axis::X),
            Role::Motor(Axis::Z),
        ];
        let mut published = Vec::with_capacity(peers.len());
        for peer in peers {
            let path = dir.identity(Role::Watchdog, peer);
            let done = off_runtime(format!("publish-{}", peer.slug()), move || {
                identity::publish(&path, own)
            })?;
            published.push((peer, done));
        }
        for (peer, done) in published {
            done.await.map_err(|_| WatchdogError::HandshakeAborted)??;
            info!("Sent {own} to {peer}");
        }

        let handshake_dir = dir.clone();
        let (roster, sink) = off_runtime("handshake".to_string(), move || {
            let inspector =
                identity::acquire(&handshake_dir.identity(Role::Inspector, Role::Watchdog))?;
            let motors = AxisMap::try_from_fn(|axis| {
                identity::acquire(&handshake_dir.identity(Role::Motor(axis), Role::Watchdog))
            })?;
            let sink = ChannelWriter::open(handshake_dir.control(Role::Inspector, Role::Watchdog))?;
            Ok::<_, ChannelError>((Roster { inspector, motors }, sink))
        })?
        .await
        .map_err(|_| WatchdogError::HandshakeAborted)??;
        info!(
            "Supervising inspector ({}) and motors (x: {}, z: {})",
            roster.inspector, roster.motors.x, roster.motors.z
        );

        Ok(Self::new(
            dir,
            config.timing.watchdog_window(),
            sink,
            roster,
            inbox,
        ))
    }
}

impl<S: ResetSink> WatchdogContext<S> {
    pub fn new(
        dir: ChannelDirectory,
        window: Duration,
        sink: S,
        roster: Roster,
        inbox: Inbox,
    ) -> Self {
        Self {
            dir,
            switch: DeadManSwitch::new(window),
            sink,
            inbox,
            roster,
            resync_pending: false,
            stats: WatchdogStats::default(),
        }
    }

    pub fn roster(&self) -> Roster {
        self.roster
    }

    pub fn stats(&self) -> WatchdogStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Sender feeding this watchdog's inbox.
    pub fn inbox_sender(&self) -> tokio::sync::mpsc::Sender<Inbound> {
        self.inbox.sender()
    }

    /// Run the cycle until the commander sends `Terminate`.
    pub async fn run(&mut self) -> Result<(), WatchdogError> {
        info!("Watchdog armed, window {:?}", self.switch.window());
        while self.step().await? == Flow::Continue {}
        info!(
            "Watchdog exiting ({} pings, {} forced resets, {} emergency stops)",
            self.stats.pings, self.stats.forced_resets, self.stats.emergencies
        );
        Ok(())
    }

    /// Wait for the window to elapse or for one inbound event, whichever is first.
    pub async fn step(&mut self) -> Result<Flow, WatchdogError> {
        let deadline = match self.switch.deadline() {
            Some(deadline) => deadline,
            None => self.switch.arm(Instant::now()),
        };

        tokio::select! {
            _ = sleep_until(deadline) => {
                if self.switch.expire(Instant::now()) {
                    self.stats.forced_resets += 1;
                    warn!(
                        "No activity for {:?}, forcing RESET (#{})",
                        self.switch.window(),
                        self.stats.forced_resets
                    );
                    self.sink.forced_reset()?;
                }
                Ok(Flow::Continue)
            }
            event = self.inbox.recv() => match event {
                Some(event) => self.handle(event),
                None => Err(WatchdogError::InboxClosed),
            },
        }
    }

    fn handle(&mut self, event: Inbound) -> Result<Flow, WatchdogError> {
        match event {
            Inbound::Control {
                from,
                msg: ControlMessage::Ping,
            } => {
                self.stats.pings += 1;
                debug!("Ping from {from}");
                self.switch.disarm();
            }
            Inbound::Control {
                from: Role::Inspector,
                msg: ControlMessage::EmergencyNotify,
            } => {
                self.stats.emergencies += 1;
                warn!("Emergency stop reported, motors are being replaced");
                self.switch.disarm();
                self.start_resync()?;
            }
            Inbound::Control {
                from: Role::Commander,
                msg: ControlMessage::Terminate,
            } => {
                info!("Terminate received from commander");
                return Ok(Flow::Exit);
            }
            Inbound::Control { from, msg } => warn!("Unexpected {msg:?} from {from}, ignored"),
            Inbound::Resynced(motors) => {
                self.resync_pending = false;
                self.roster.motors = motors;
                info!("Motors resynced (x: {}, z: {})", motors.x, motors.z);
            }
            Inbound::ResyncFailed(e) => return Err(WatchdogError::Resync(e)),
            Inbound::PumpFailed { from, error } => {
                return Err(WatchdogError::Pump {
                    from,
                    source: error,
                });
            }
        }
        Ok(Flow::Continue)
    }

    /// Hand our identity to the replacement motors and learn theirs.
    ///
    /// Runs off the cycle so that pings keep being handled meanwhile.
    fn start_resync(&mut self) -> Result<(), WatchdogError> {
        if self.resync_pending {
            warn!("Resync already in progress");
            return Ok(());
        }
        self.resync_pending = true;

        let dir = self.dir.clone();
        let tx = self.inbox.sender();
        let own = Identity::current();
        thread::Builder::new()
            .name("resync".to_string())
            .spawn(move || {
                let event = match resync_motors(&dir, own) {
                    Ok(motors) => Inbound::Resynced(motors),
                    Err(e) => Inbound::ResyncFailed(e),
                };
                let _ = tx.blocking_send(event);
            })
            .map_err(WatchdogError::Thread)?;
        Ok(())
    }
}

fn resync_motors(dir: &ChannelDirectory, own: Identity) -> ChannelResult<AxisMap<Identity>> {
    for axis in Axis::ALL {
        identity::publish(&dir.identity(Role::Watchdog, Role::Motor(axis)), own)?;
    }
    AxisMap::try_from_fn(|axis| identity::acquire(&dir.identity(Role::Motor(axis), Role::Watchdog)))
}
