//! Controller role: RESET, EMERGENCY STOP and motor supervision.
//!
//! The controller waits on three sources at once (keyboard, watchdog control
//! channel, commander control channel) and handles whichever is ready:
//!
//! | Source    | Input         | Effect                                        |
//! |-----------|---------------|-----------------------------------------------|
//! | keyboard  | `r`           | ping watchdog, RESET both motors              |
//! | keyboard  | space         | emergency stop and motor replacement          |
//! | keyboard  | Ctrl+C        | stop renderer, exit, motors left running      |
//! | watchdog  | `ForcedReset` | RESET both motors                             |
//! | commander | `Terminate`   | stop renderer and motors, exit                |

use crate::supervisor::{MotorLauncher, MotorSupervisor};
use hoist_common::channel::identity;
use hoist_common::channel::{
    ChannelDirectory, ChannelError, ChannelReader, ChannelResult, ChannelWriter,
};
use hoist_common::config::HoistConfig;
use hoist_common::prelude::*;
use hoist_common::supervisor::{Supervisor, SupervisorError};
use hoist_common::terminal::{KeySource, keys};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::io;
use std::os::fd::AsFd;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

/// Fatal controller failures.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("motor supervision failed: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("keyboard read failed: {0}")]
    Keyboard(#[from] io::Error),

    #[error("poll failed: {0}")]
    Poll(#[source] Errno),

    #[error("failed to spawn renderer: {0}")]
    RendererSpawn(#[source] io::Error),
}

/// Whether the controller loop continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Identities learned during the boot handshake.
#[derive(Debug, Clone, Copy)]
pub struct BootIdentities {
    pub watchdog: Identity,
    pub motors: AxisMap<Identity>,
}

/// Handshake steps that must happen before the renderer exists.
///
/// Acquires the watchdog identity, then both motor identities, then opens
/// the inbound control channels.
pub fn handshake(dir: &ChannelDirectory) -> ChannelResult<(BootIdentities, ControlInbox)> {
    let watchdog = identity::acquire(&dir.identity(Role::Watchdog, Role::Inspector))?;
    info!("Watchdog is {watchdog}");
    let motors = AxisMap::try_from_fn(|axis| {
        identity::acquire(&dir.identity(Role::Motor(axis), Role::Inspector))
    })?;
    info!("Motors detected (x: {}, z: {})", motors.x, motors.z);

    let inbox = ControlInbox::open(dir)?;
    Ok((BootIdentities { watchdog, motors }, inbox))
}

/// Start the renderer role as a child of this process.
///
/// The child shares the terminal's output but never reads the keyboard.
pub fn spawn_renderer(
    config: Option<&Path>,
    verbose: bool,
    json: bool,
) -> Result<Child, ControllerError> {
    let exe = std::env::current_exe().map_err(ControllerError::RendererSpawn)?;
    let mut command = Command::new(exe);
    command.arg("--role").arg("renderer");
    if let Some(config) = config {
        command.arg("--config").arg(config);
    }
    if verbose {
        command.arg("--verbose");
    }
    if json {
        command.arg("--json");
    }
    let child = command
        .stdin(Stdio::null())
        .spawn()
        .map_err(ControllerError::RendererSpawn)?;
    info!("Renderer started (pid {})", child.id());
    Ok(child)
}

/// Inbound control channels.
pub struct ControlInbox {
    from_watchdog: ChannelReader<ControlMessage>,
    from_commander: ChannelReader<ControlMessage>,
}

impl ControlInbox {
    pub fn open(dir: &ChannelDirectory) -> ChannelResult<Self> {
        Ok(Self {
            from_watchdog: ChannelReader::open(dir.control(Role::Inspector, Role::Watchdog))?,
            from_commander: ChannelReader::open(dir.control(Role::Inspector, Role::Commander))?,
        })
    }
}

/// Everything the controller process owns.
pub struct ControllerContext<L: MotorLauncher> {
    supervisor: MotorSupervisor<L>,
    watchdog: ChannelWriter<ControlMessage>,
    inbox: ControlInbox,
    renderer: Option<Child>,
    resets: u64,
    emergencies: u64,
}

impl<L: MotorLauncher> ControllerContext<L> {
    /// Final boot steps once the renderer is running.
    ///
    /// Publishes our identity to the watchdog, connects the motor command
    /// channels, then the control channel to the watchdog.
    pub fn connect(
        dir: ChannelDirectory,
        config: &HoistConfig,
        motors: AxisMap<Identity>,
        inbox: ControlInbox,
        launcher: L,
        renderer: Option<Child>,
    ) -> ChannelResult<Self> {
        let own = Identity::current();
        identity::publish(&dir.identity(Role::Inspector, Role::Watchdog), own)?;
        info!("Sent {own} to watchdog");

        let watchdog_ctl = dir.control(Role::Watchdog, Role::Inspector);
        let supervisor =
            MotorSupervisor::adopt(dir, launcher, config.timing.respawn_timeout(), motors)?;
        let watchdog = ChannelWriter::open(watchdog_ctl)?;
        info!("Controller ready");

        Ok(Self {
            supervisor,
            watchdog,
            inbox,
            renderer,
            resets: 0,
            emergencies: 0,
        })
    }

    pub fn supervisor(&self) -> &MotorSupervisor<L> {
        &self.supervisor
    }

    /// Multiplex keyboard and control channels until told to exit.
    pub fn run<K: KeySource + AsFd>(&mut self, keys: &mut K) -> Result<(), ControllerError> {
        loop {
            let ready = self.wait(keys)?;
            let mut flow = Flow::Continue;

            if ready[0] {
                flow = self.handle_key(keys.next_key()?)?;
            }
            if flow == Flow::Continue && ready[1] {
                if let Some(msg) = self.receive(Role::Watchdog)? {
                    flow = self.handle_control(Role::Watchdog, msg)?;
                }
            }
            if flow == Flow::Continue && ready[2] {
                if let Some(msg) = self.receive(Role::Commander)? {
                    flow = self.handle_control(Role::Commander, msg)?;
                }
            }

            if flow == Flow::Exit {
                info!(
                    "Controller exiting ({} resets, {} emergency stops)",
                    self.resets, self.emergencies
                );
                return Ok(());
            }
        }
    }

    /// Block until at least one source is readable: `[keys, watchdog, commander]`.
    fn wait<K: AsFd>(&self, keys: &K) -> Result<[bool; 3], ControllerError> {
        let mut fds = [
            PollFd::new(keys.as_fd(), PollFlags::POLLIN),
            PollFd::new(self.inbox.from_watchdog.as_fd(), PollFlags::POLLIN),
            PollFd::new(self.inbox.from_commander.as_fd(), PollFlags::POLLIN),
        ];
        loop {
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => break,
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(ControllerError::Poll(e)),
            }
        }
        let readable = PollFlags::POLLIN | PollFlags::POLLHUP;
        Ok([0, 1, 2].map(|i| fds[i].revents().is_some_and(|r| r.intersects(readable))))
    }

    fn receive(&mut self, from: Role) -> ChannelResult<Option<ControlMessage>> {
        let reader = match from {
            Role::Commander => &mut self.inbox.from_commander,
            _ => &mut self.inbox.from_watchdog,
        };
        match reader.recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(e) if !e.is_fatal() => {
                warn!("Dropping control record from {from}: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// React to one key press.
    pub fn handle_key(&mut self, key: u8) -> Result<Flow, ControllerError> {
        match key {
            keys::RESET => {
                self.watchdog.send(&ControlMessage::Ping)?;
                self.reset_motors()?;
            }
            keys::EMERGENCY => self.emergency_stop()?,
            keys::INTERRUPT => {
                info!("Interrupted from keyboard, motors left running");
                self.stop_renderer();
                return Ok(Flow::Exit);
            }
            other => trace!(key = other, "Ignoring unbound key"),
        }
        Ok(Flow::Continue)
    }

    /// React to one control message.
    pub fn handle_control(
        &mut self,
        from: Role,
        msg: ControlMessage,
    ) -> Result<Flow, ControllerError> {
        match (from, msg) {
            (Role::Watchdog, ControlMessage::ForcedReset) => {
                info!("Watchdog forced a RESET");
                self.reset_motors()?;
            }
            (Role::Commander, ControlMessage::Terminate) => {
                info!("Terminate received from commander");
                self.shutdown()?;
                return Ok(Flow::Exit);
            }
            (from, msg) => warn!("Unexpected {msg:?} from {from}, ignored"),
        }
        Ok(Flow::Continue)
    }

    fn reset_motors(&mut self) -> ChannelResult<()> {
        self.supervisor.broadcast(MotorCommand::Reset)?;
        self.resets += 1;
        info!("RESET sent to both motors (#{})", self.resets);
        Ok(())
    }

    /// Kill both motors immediately and replace them.
    ///
    /// 1. Tell the watchdog that motor identities are about to change.
    /// 2. SIGKILL both motors.
    /// 3. Relaunch both and wait for their identities.
    pub fn emergency_stop(&mut self) -> Result<(), ControllerError> {
        self.emergencies += 1;
        warn!("EMERGENCY STOP #{}", self.emergencies);
        self.watchdog.send(&ControlMessage::EmergencyNotify)?;

        for axis in Axis::ALL {
            self.supervisor.terminate(axis, true)?;
        }
        info!("Motors stopped, relaunching");

        let identities = self.supervisor.replace_all().inspect_err(|e| {
            error!("Motor replacement failed: {e}");
        })?;
        info!(
            "Motors re-initialized (x: {}, z: {})",
            identities.x, identities.z
        );
        Ok(())
    }

    /// Stop the renderer, then ask both motors to shut down.
    fn shutdown(&mut self) -> Result<(), ControllerError> {
        self.stop_renderer();
        for axis in Axis::ALL {
            self.supervisor.terminate(axis, false)?;
        }
        Ok(())
    }

    fn stop_renderer(&mut self) {
        if let Some(mut child) = self.renderer.take() {
            debug!("Stopping renderer (pid {})", child.id());
            if let Err(e) = child.kill() {
                warn!("Failed to kill renderer: {e}");
            }
            if let Err(e) = child.wait() {
                warn!("Failed to reap renderer: {e}");
            }
        }
    }
}

impl<L: MotorLauncher> Drop for ControllerContext<L> {
    fn drop(&mut self) {
        self.stop_renderer();
    }
}
