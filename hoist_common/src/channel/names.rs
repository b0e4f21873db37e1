//! Well-known channel names.
//!
//! Every channel has exactly one writer role and one reader role, and the
//! name spells both out:
//!
//! | Channel                          | Writer        | Reader        | Records          |
//! |----------------------------------|---------------|---------------|------------------|
//! | `motor_cmd_<axis>_commander`     | commander     | motor         | `MotorCommand`   |
//! | `motor_cmd_<axis>_inspector`     | inspector     | motor         | `MotorCommand`   |
//! | `telemetry_<axis>`               | motor         | renderer      | `Telemetry`      |
//! | `ctl_<to>_from_<from>`           | `<from>`      | `<to>`        | `ControlMessage` |
//! | `pid_<publisher>_for_<consumer>` | `<publisher>` | `<consumer>`  | `Identity`       |

use super::{ChannelError, ChannelResult, ChannelWriter};
use crate::axis::Axis;
use crate::protocol::ControlMessage;
use crate::role::Role;
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolves channel names inside one channel directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDirectory {
    root: PathBuf,
}

impl ChannelDirectory {
    /// Directory rooted at `root`. Nothing is created until [`ChannelDirectory::prepare`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory hosting the FIFOs.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet.
    pub fn prepare(&self) -> ChannelResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|source| ChannelError::Create {
            path: self.root.clone(),
            source,
        })
    }

    /// Commands sent to the motor on `axis` by `from` (commander or inspector).
    pub fn motor_commands(&self, axis: Axis, from: Role) -> PathBuf {
        self.root.join(format!("motor_cmd_{axis}_{from}"))
    }

    /// Telemetry published by the motor on `axis`.
    pub fn telemetry(&self, axis: Axis) -> PathBuf {
        self.root.join(format!("telemetry_{axis}"))
    }

    /// Control messages delivered to `to`, written by `from`.
    pub fn control(&self, to: Role, from: Role) -> PathBuf {
        self.root.join(format!("ctl_{to}_from_{from}"))
    }

    /// Identity of `of`, published for `for_`.
    pub fn identity(&self, of: Role, for_: Role) -> PathBuf {
        self.root.join(format!("pid_{of}_for_{for_}"))
    }

    /// Open the control writer from `from` to `to`, blocking until `to` listens.
    pub fn control_writer(&self, to: Role, from: Role) -> ChannelResult<ChannelWriter<ControlMessage>> {
        let path = self.control(to, from);
        info!("Connecting control channel {}", path.display());
        ChannelWriter::open(path)
    }
    /// Every channel path in the topology.
    pub fn all_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for axis in Axis::ALL {
            paths.push(self.motor_commands(axis, Role::Commander));
            paths.push(self.motor_commands(axis, Role::Inspector));
            paths.push(self.telemetry(axis));
            paths.push(self.identity(Role::Motor(axis), Role::Inspector));
            paths.push(self.identity(Role::Motor(axis), Role::Watchdog));
            paths.push(self.identity(Role::Watchdog, Role::Motor(axis)));
        }
        paths.push(self.control(Role::Watchdog, Role::Commander));
        paths.push(self.control(Role::Watchdog, Role::Inspector));
        paths.push(self.control(Role::Inspector, Role::Watchdog));
        paths.push(self.control(Role::Inspector, Role::Commander));
        paths.push(self.identity(Role::Watchdog, Role::Commander));
        paths.push(self.identity(Role::Watchdog, Role::Inspector));
        paths.push(self.identity(Role::Inspector, Role::Watchdog));
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_spell_out_both_ends() {
        let dir = ChannelDirectory::new("/tmp/hoist");
        assert_eq!(
            dir.motor_commands(Axis::X, Role::Commander),
            PathBuf::from("/tmp/hoist/motor_cmd_x_commander")
        );
        assert_eq!(dir.telemetry(Axis::Z), PathBuf::from("/tmp/hoist/telemetry_z"));
        assert_eq!(
            dir.control(Role::Watchdog, Role::Inspector),
            PathBuf::from("/tmp/hoist/ctl_watchdog_from_inspector")
        );
        assert_eq!(
            dir.identity(Role::Motor(Axis::Z), Role::Watchdog),
            PathBuf::from("/tmp/hoist/pid_motor_z_for_watchdog")
        );
    }

    #[test]
    fn topology_has_no_duplicate_channels() {
        let dir = ChannelDirectory::new("tmp");
        let mut paths = dir.all_paths();
        let total = paths.len();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), total);
    }
}
