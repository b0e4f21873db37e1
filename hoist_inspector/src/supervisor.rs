//! Motor supervision: command channels, SIGKILL and relaunch.

use hoist_common::channel::identity;
use hoist_common::channel::{ChannelDirectory, ChannelError, ChannelResult, ChannelWriter};
use hoist_common::prelude::*;
use hoist_common::supervisor::{Supervisor, SupervisorError};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Interval between `try_wait` polls while reaping a motor.
const REAP_POLL: Duration = Duration::from_millis(20);

/// Starts motor processes.
pub trait MotorLauncher {
    /// Start a motor for `axis`. The process runs the normal motor boot.
    fn launch(&mut self, axis: Axis) -> io::Result<Child>;
}

/// Launches the motor binary with the inspector's own configuration.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    pub binary: PathBuf,
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub json: bool,
}

impl MotorLauncher for ProcessLauncher {
    fn launch(&mut self, axis: Axis) -> io::Result<Child> {
        let mut command = Command::new(&self.binary);
        command.arg("--axis").arg(axis.name());
        if let Some(config) = &self.config {
            command.arg("--config").arg(config);
        }
        if self.verbose {
            command.arg("--verbose");
        }
        if self.json {
            command.arg("--json");
        }
        // The terminal belongs to the inspector.
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        debug!("Launching {:?}", command);
        command.spawn()
    }
}

/// One supervised motor.
#[derive(Debug)]
pub struct SupervisedMotor {
    identity: Identity,
    /// Only motors we launched ourselves can be reaped.
    child: Option<Child>,
    commands: ChannelWriter<MotorCommand>,
    generation: u32,
}

impl SupervisedMotor {
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// 0 for the motors found at boot, incremented on every relaunch.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Owns the inspector side of both motors.
pub struct MotorSupervisor<L: MotorLauncher> {
    dir: ChannelDirectory,
    launcher: L,
    respawn_timeout: Duration,
    motors: AxisMap<SupervisedMotor>,
}

impl<L: MotorLauncher> MotorSupervisor<L> {
    /// Take over motors that booted on their own and connect their command channels.
    pub fn adopt(
        dir: ChannelDirectory,
        launcher: L,
        respawn_timeout: Duration,
        identities: AxisMap<Identity>,
    ) -> ChannelResult<Self> {
        let motors = AxisMap::try_from_fn(|axis| {
            let commands = ChannelWriter::open(dir.motor_commands(axis, Role::Inspector))?;
            info!("Supervising motor {axis} ({})", identities[axis]);
            Ok::<_, ChannelError>(SupervisedMotor {
                identity: identities[axis],
                child: None,
                commands,
                generation: 0,
            })
        })?;
        Ok(Self {
            dir,
            launcher,
            respawn_timeout,
            motors,
        })
    }

    pub fn motor(&self, axis: Axis) -> &SupervisedMotor {
        &self.motors[axis]
    }

    /// Current identities of both motors.
    pub fn identities(&self) -> AxisMap<Identity> {
        AxisMap::from_fn(|axis| self.motors[axis].identity)
    }

    /// Send one command to the motor on `axis`.
    pub fn send(&mut self, axis: Axis, command: MotorCommand) -> ChannelResult<()> {
        self.motors[axis].commands.send(&command)
    }

    /// Send `command` to both motors, X first.
    pub fn broadcast(&mut self, command: MotorCommand) -> ChannelResult<()> {
        for axis in Axis::ALL {
            self.send(axis, command)?;
        }
        Ok(())
    }

    /// Relaunch both motors, then wait for both to come up.
    ///
    /// Both processes are started before waiting so that their boots overlap.
    pub fn replace_all(&mut self) -> Result<AxisMap<Identity>, SupervisorError> {
        for axis in Axis::ALL {
            self.launch(axis)?;
        }
        AxisMap::try_from_fn(|axis| self.await_ready(axis))
    }

    fn launch(&mut self, axis: Axis) -> Result<(), SupervisorError> {
        let child = self
            .launcher
            .launch(axis)
            .map_err(|e| SupervisorError::SpawnFailed {
                axis,
                reason: e.to_string(),
            })?;
        info!("Launched motor {axis} (pid {})", child.id());
        let motor = &mut self.motors[axis];
        if let Some(stale) = motor.child.replace(child) {
            warn!("Motor {axis} relaunched before pid {} was reaped", stale.id());
        }
        Ok(())
    }

    /// Wait for a launched motor's identity, then reconnect its command channel.
    fn await_ready(&mut self, axis: Axis) -> Result<Identity, SupervisorError> {
        let me = Role::Motor(axis);
        let identity =
            identity::acquire_timeout(&self.dir.identity(me, Role::Inspector), self.respawn_timeout)
                .map_err(|e| match e {
                    ChannelError::Timeout { timeout, .. } => SupervisorError::IdentityTimeout {
                        axis,
                        timeout_s: timeout.as_secs_f64(),
                    },
                    other => SupervisorError::Channel(other),
                })?;

        let commands = ChannelWriter::open_timeout(
            self.dir.motor_commands(axis, Role::Inspector),
            self.respawn_timeout,
        )?;

        let motor = &mut self.motors[axis];
        if let Some(child) = &motor.child {
            if child.id() as i32 != identity.pid {
                warn!(
                    "Motor {axis} published {identity} but launched pid was {}",
                    child.id()
                );
            }
        }
        motor.identity = identity;
        motor.commands = commands;
        motor.generation += 1;
        info!(
            "Motor {axis} is back ({identity}, generation {})",
            motor.generation
        );
        Ok(identity)
    }
}

impl<L: MotorLauncher> Supervisor for MotorSupervisor<L> {
    fn terminate(&mut self, axis: Axis, forceful: bool) -> Result<(), SupervisorError> {
        let timeout = self.respawn_timeout;
        let motor = &mut self.motors[axis];

        if forceful {
            match kill(motor.identity.as_pid(), Signal::SIGKILL) {
                Ok(()) => info!("Killed motor {axis} ({})", motor.identity),
                Err(Errno::ESRCH) => debug!("Motor {axis} ({}) already gone", motor.identity),
                Err(source) => {
                    return Err(SupervisorError::KillFailed {
                        axis,
                        pid: motor.identity.pid,
                        source,
                    });
                }
            }
        } else {
            match motor.commands.send(&MotorCommand::Shutdown) {
                Ok(()) => info!("Asked motor {axis} to shut down"),
                Err(ChannelError::Disconnected { .. }) => {
                    debug!("Motor {axis} already released its channels")
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(child) = motor.child.take() {
            reap(axis, child, timeout);
        }
        Ok(())
    }

    fn respawn(&mut self, axis: Axis) -> Result<Identity, SupervisorError> {
        self.launch(axis)?;
        self.await_ready(axis)
    }
}

/// Collect the exit status of a motor we launched, giving up after `timeout`.
fn reap(axis: Axis, mut child: Child, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Motor {axis} (pid {}) exited: {status}", child.id());
                return;
            }
            Ok(None) if Instant::now() < deadline => thread::sleep(REAP_POLL),
            Ok(None) => {
                warn!("Motor {axis} (pid {}) still running after {timeout:?}", child.id());
                return;
            }
            Err(e) => {
                warn!("Failed to reap motor {axis} (pid {}): {e}", child.id());
                return;
            }
        }
    }
}
