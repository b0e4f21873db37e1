//! Hoist Common Library
//!
//! Shared building blocks for the hoist actors: the FIFO channel primitive,
//! the tagged wire protocol, configuration, logging and terminal helpers.
//!
//! # Module Structure
//!
//! - [`axis`] - Axis identifiers and per-axis maps
//! - [`role`] - Actor roles used in channel names and log spans
//! - [`protocol`] - Fixed-width tagged records
//! - [`channel`] - Named FIFO channels and identity handshakes
//! - [`config`] - Configuration loading traits and types
//! - [`logging`] - Locked append-only log files
//! - [`terminal`] - Raw key capture and the ASCII display
//! - [`supervisor`] - Motor lifecycle contract
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use hoist_common::prelude::*;
//!
//! let dir = ChannelDirectory::new("tmp");
//! let path = dir.motor_commands(Axis::X, Role::Commander);
//! assert!(path.ends_with("motor_cmd_x_commander"));
//! ```

pub mod axis;
pub mod channel;
pub mod config;
pub mod consts;
pub mod logging;
pub mod prelude;
pub mod protocol;
pub mod role;
pub mod supervisor;
pub mod terminal;
