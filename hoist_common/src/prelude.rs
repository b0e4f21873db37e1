//! Prelude module for common re-exports.
//!
//! Consumers can do `use hoist_common::prelude::*;` and get the most
//! important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use hoist_common::prelude::*;
//! ```

// ─── Topology ───────────────────────────────────────────────────────
pub use crate::axis::{Axis, AxisMap};
pub use crate::role::Role;

// ─── Wire protocol ──────────────────────────────────────────────────
pub use crate::protocol::{ControlMessage, Identity, MotorCommand, ProtocolError, Record, Telemetry};

// ─── Channels ───────────────────────────────────────────────────────
pub use crate::channel::identity::{acquire, acquire_timeout, publish};
pub use crate::channel::{
    ChannelDirectory, ChannelError, ChannelReader, ChannelResult, ChannelWriter,
};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, HoistConfig, LogLevel, SharedConfig};

// ─── Supervision ────────────────────────────────────────────────────
pub use crate::supervisor::{Supervisor, SupervisorError};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{FATAL_EXIT_CODE, VELOCITY_STEP};
