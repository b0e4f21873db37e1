//! # Hoist Motor Library
//!
//! One motor process drives one axis. Every tick it drains at most one
//! command from each inbound channel, integrates the speed into the position,
//! clamps to the axis range and publishes a noisy position estimate.
//!
//! # Module Structure
//!
//! - [`motor`] - Pure kinematics and telemetry noise
//! - [`actor`] - Channels, boot handshake and the tick loop
//!
//! # Architecture
//!
//! ```text
//!  motor_cmd_<axis>_inspector ──┐
//!                               ├──► MotorActor ──► MotorState::step ──► telemetry_<axis>
//!  motor_cmd_<axis>_commander ──┘
//! ```

pub mod actor;
pub mod motor;

pub use crate::actor::{ExitReason, MotorActor};
pub use crate::motor::{MotorState, Outcome, TelemetryNoise, Tick};
