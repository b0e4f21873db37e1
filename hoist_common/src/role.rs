//! Actor roles, used to scope channel names and log spans.

use crate::axis::Axis;
use std::fmt;

/// Identifies one actor process in the hoist process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Keyboard commander.
    Commander,
    /// Inspector controller role (RESET / EMERGENCY STOP).
    Inspector,
    /// Inspector renderer role (telemetry display).
    Renderer,
    /// Dead-man-switch supervisor.
    Watchdog,
    /// Motor actor driving one axis.
    Motor(Axis),
}

impl Role {
    /// Short lowercase identifier, e.g. `motor_x`.
    pub fn slug(self) -> String {
        match self {
            Role::Commander => "commander".to_string(),
            Role::Inspector => "inspector".to_string(),
            Role::Renderer => "renderer".to_string(),
            Role::Watchdog => "watchdog".to_string(),
            Role::Motor(axis) => format!("motor_{axis}"),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}
