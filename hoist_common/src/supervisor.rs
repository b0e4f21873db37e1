//! # Supervisor Trait
//!
//! Defines the contract the inspector controller uses to manage motor
//! processes: cooperative or forceful termination, and relaunch.
//!
//! The trait is thin on purpose. It names the two lifecycle operations the
//! emergency-stop procedure needs without prescribing how processes are
//! started (a real binary in production, a stand-in in tests).

use crate::axis::Axis;
use crate::channel::ChannelError;
use crate::protocol::Identity;
use nix::errno::Errno;
use nix::sys::signal::kill;

/// Error type for supervisor operations.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// Failed to launch a replacement motor.
    #[error("failed to spawn motor {axis}: {reason}")]
    SpawnFailed { axis: Axis, reason: String },

    /// Failed to deliver SIGKILL.
    #[error("failed to kill motor {axis} ({pid}): {source}")]
    KillFailed {
        axis: Axis,
        pid: i32,
        #[source]
        source: Errno,
    },

    /// A relaunched motor did not publish its identity in time.
    #[error("motor {axis} did not publish its identity within {timeout_s:.1}s")]
    IdentityTimeout { axis: Axis, timeout_s: f64 },

    /// Channel failure while talking to a motor.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Lifecycle control over the motor processes.
///
/// # Example
///
/// ```rust,ignore
/// struct MotorSupervisor { /* ... */ }
///
/// impl Supervisor for MotorSupervisor {
///     fn terminate(&mut self, axis: Axis, forceful: bool)
///         -> Result<(), SupervisorError> { /* ... */ }
///     fn respawn(&mut self, axis: Axis) -> Result<Identity, SupervisorError> { /* ... */ }
/// }
/// ```
pub trait Supervisor {
    /// Stop the motor on `axis`.
    ///
    /// - `forceful = false`: send `Shutdown` on the command channel and let
    ///   the motor release its channels.
    /// - `forceful = true`: SIGKILL the process. A process that is already
    ///   gone counts as terminated.
    fn terminate(&mut self, axis: Axis, forceful: bool) -> Result<(), SupervisorError>;

    /// Launch a fresh motor for `axis`, wait for its identity and reconnect
    /// the command channel. Returns the new identity.
    fn respawn(&mut self, axis: Axis) -> Result<Identity, SupervisorError>;
}

/// Whether the process behind `identity` still exists.
///
/// Uses the null signal, so nothing is delivered.
pub fn is_alive(identity: Identity) -> bool {
    match kill(identity.as_pid(), None) {
        Ok(()) => true,
        // Exists but belongs to someone else.
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(is_alive(Identity::current()));
    }

    #[test]
    fn reaped_child_is_not_alive() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let identity = Identity {
            pid: child.id() as i32,
        };
        child.wait().unwrap();
        assert!(!is_alive(identity));
    }

    #[test]
    fn errors_name_the_axis() {
        let err = SupervisorError::IdentityTimeout {
            axis: Axis::Z,
            timeout_s: 5.0,
        };
        assert_eq!(
            err.to_string(),
            "motor z did not publish its identity within 5.0s"
        );
    }
}
