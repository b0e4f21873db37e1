//! # Hoist Commander Library
//!
//! Keyboard console driving the hoist. Movement and halt keys become motor
//! commands, every action pings the watchdog, and quit shuts everything down.
//!
//! # Module Structure
//!
//! - [`keymap`] - Key bindings
//! - [`context`] - Channels and the dispatch loop

pub mod context;
pub mod keymap;

pub use crate::context::{CommanderContext, CommanderError, Flow};
pub use crate::keymap::{Action, action_for};
