//! # Hoist Inspector Library
//!
//! The inspector runs as two processes. The renderer draws the hoist from
//! motor telemetry. The controller reads RESET and EMERGENCY STOP keys,
//! obeys the watchdog and the commander, and owns the motor processes.
//!
//! # Module Structure
//!
//! - [`renderer`] - Telemetry display loop
//! - [`controller`] - Keyboard and control channel multiplexing
//! - [`supervisor`] - Motor kill, relaunch and reconnection

pub mod controller;
pub mod renderer;
pub mod supervisor;

pub use crate::controller::{
    BootIdentities, ControlInbox, ControllerContext, ControllerError, Flow, handshake,
    spawn_renderer,
};
pub use crate::renderer::{Renderer, RendererError};
pub use crate::supervisor::{MotorLauncher, MotorSupervisor, ProcessLauncher, SupervisedMotor};
