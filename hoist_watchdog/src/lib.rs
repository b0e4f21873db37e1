//! # Hoist Watchdog Library
//!
//! Dead-man switch for the hoist. Commander and inspector ping it on every
//! operator action; a whole window without a ping makes the inspector RESET
//! both motors. After an emergency stop it re-learns the motor identities.
//!
//! # Module Structure
//!
//! - [`deadman`] - Countdown with a cancel flag
//! - [`inbox`] - Control channel pumps feeding the cycle
//! - [`context`] - Boot handshake and the `select!` cycle

pub mod context;
pub mod deadman;
pub mod inbox;

pub use crate::context::{Flow, ResetSink, Roster, WatchdogContext, WatchdogError, WatchdogStats};
pub use crate::deadman::DeadManSwitch;
pub use crate::inbox::{Inbound, Inbox, spawn_pump};
