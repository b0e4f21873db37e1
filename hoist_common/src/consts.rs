//! System-wide constants for the hoist workspace.
//!
//! Single source of truth for protocol sizes, defaults and exit codes.
//! Imported by all crates; values are defined here only.

/// Number of axes driven by motor actors.
pub const AXIS_COUNT: usize = 2;

/// Size of every record on every channel, in bytes (`u32` tag + 4-byte payload).
pub const RECORD_SIZE: usize = 8;

/// Permission bits for newly created channel FIFOs.
pub const FIFO_MODE: u32 = 0o666;

/// Exit code of an actor that hit a fatal channel, log or supervision failure.
pub const FATAL_EXIT_CODE: i32 = -1;

/// Default motor tick / renderer refresh interval in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 2000;

/// Default dead-man-switch window in seconds.
pub const DEFAULT_WATCHDOG_TIMEOUT_S: u64 = 60;

/// Default time a relaunched motor gets to publish its identity, in milliseconds.
pub const DEFAULT_RESPAWN_TIMEOUT_MS: u64 = 5000;

/// Default commander delay between sending SHUTDOWN and exiting, in milliseconds.
pub const DEFAULT_QUIT_GRACE_MS: u64 = 1000;

/// Default travel range of each axis: `[0, DEFAULT_AXIS_BOUND]`.
pub const DEFAULT_AXIS_BOUND: f32 = 100.0;

/// Maximum magnitude of the telemetry perturbation.
pub const TELEMETRY_JITTER: f32 = 0.5;

/// Upper clamp of reported telemetry, independent of the axis bound.
pub const TELEMETRY_DISPLAY_MAX: f32 = 100.0;

/// Velocity delta sent per commander key press.
pub const VELOCITY_STEP: f32 = 1.0;

/// Default directory hosting the channel FIFOs.
pub const DEFAULT_CHANNEL_DIR: &str = "tmp";

/// Default directory for the append-only log files.
pub const DEFAULT_LOG_DIR: &str = "log";

/// Default path of the motor binary relaunched after an emergency stop.
pub const DEFAULT_MOTOR_BINARY: &str = "./target/debug/hoist_motor";

/// File name of the info log stream.
pub const INFO_LOG_FILE: &str = "info.log";

/// File name of the error log stream.
pub const ERROR_LOG_FILE: &str = "error.log";
