//! Commander channels and key dispatch.

use crate::keymap::{Action, action_for};
use hoist_common::channel::identity;
use hoist_common::channel::{ChannelDirectory, ChannelError, ChannelResult, ChannelWriter};
use hoist_common::config::HoistConfig;
use hoist_common::prelude::*;
use hoist_common::terminal::KeySource;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Fatal commander failures.
#[derive(Debug, Error)]
pub enum CommanderError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("keyboard read failed: {0}")]
    Keyboard(#[from] io::Error),
}

/// Whether the dispatch loop continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Channels owned by the commander.
pub struct CommanderContext {
    motors: AxisMap<ChannelWriter<MotorCommand>>,
    watchdog: ChannelWriter<ControlMessage>,
    inspector: ChannelWriter<ControlMessage>,
    quit_grace: Duration,
    dispatched: u64,
    dropped: u64,
}

impl CommanderContext {
    /// Acquire the watchdog identity, then connect.
    pub fn boot(config: &HoistConfig) -> ChannelResult<Self> {
        let dir = ChannelDirectory::new(&config.paths.channel_dir);
        dir.prepare()?;
        let watchdog = identity::acquire(&dir.identity(Role::Watchdog, Role::Commander))?;
        info!("Watchdog is {watchdog}");
        Self::connect(&dir, config)
    }

    /// Open every outbound channel. Blocks until each reader is present.
    pub fn connect(dir: &ChannelDirectory, config: &HoistConfig) -> ChannelResult<Self> {
        let motors = AxisMap::try_from_fn(|axis| {
            ChannelWriter::open(dir.motor_commands(axis, Role::Commander))
        })?;
        let watchdog = dir.control_writer(Role::Watchdog, Role::Commander)?;
        let inspector = dir.control_writer(Role::Inspector, Role::Commander)?;
        info!("Commander channels open");

        Ok(Self {
            motors,
            watchdog,
            inspector,
            quit_grace: config.timing.quit_grace(),
            dispatched: 0,
            dropped: 0,
        })
    }

    /// Read keys and dispatch them until quit.
    ///
    /// End of input counts as quit.
    pub fn run<K: KeySource>(&mut self, keys: &mut K) -> Result<(), CommanderError> {
        loop {
            let key = match keys.next_key() {
                Ok(key) => key,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    info!("Keyboard closed");
                    self.dispatch(Action::Quit)?;
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            let Some(action) = action_for(key) else {
                trace!(key, "Ignoring unbound key");
                continue;
            };
            if self.dispatch(action)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Carry out one action. Everything except quit also pings the watchdog.
    pub fn dispatch(&mut self, action: Action) -> ChannelResult<Flow> {
        debug!(?action, "Dispatching");
        self.dispatched += 1;
        match action {
            Action::Nudge { axis, delta } => {
                self.ping()?;
                self.command(axis, MotorCommand::Velocity(delta))?;
            }
            Action::Halt(axis) => {
                self.ping()?;
                self.command(axis, MotorCommand::Stop)?;
                info!("Stop requested for axis {axis}");
            }
            Action::Quit => {
                self.quit()?;
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Number of motor commands lost to a motor being replaced.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn ping(&mut self) -> ChannelResult<()> {
        self.watchdog.send(&ControlMessage::Ping)
    }

    /// A motor without reader is being replaced: the command is dropped.
    ///
    /// The FIFO outlives its reader while this writer stays open, so the same
    /// writer reaches the replacement motor once it has opened the channel.
    fn command(&mut self, axis: Axis, command: MotorCommand) -> ChannelResult<()> {
        match self.motors[axis].send(&command) {
            Err(ChannelError::Disconnected { .. }) => {
                self.dropped += 1;
                warn!("Motor {axis} unavailable, dropped {command:?}");
                Ok(())
            }
            other => other,
        }
    }

    fn quit(&mut self) -> ChannelResult<()> {
        info!("Quit requested, shutting the hoist down");
        for axis in Axis::ALL {
            self.command(axis, MotorCommand::Shutdown)?;
        }
        self.watchdog.send(&ControlMessage::Terminate)?;
        self.inspector.send(&ControlMessage::Terminate)?;
        info!(
            "Commander dispatched {} actions ({} dropped motor commands)",
            self.dispatched, self.dropped
        );
        std::thread::sleep(self.quit_grace);
        Ok(())
    }
}
