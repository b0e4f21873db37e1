//! Configuration loading traits and types.
//!
//! Every hoist binary accepts an optional `--config <path>` TOML file. Every
//! section has defaults, so a missing flag means "run with defaults".
//!
//! # Usage
//!
//! ```rust,no_run
//! use hoist_common::config::{ConfigError, HoistConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = HoistConfig::resolve(Some(Path::new("config/hoist.toml")))?;
//!     println!("Tick: {:?}", config.timing.tick());
//!     Ok(())
//! }
//! ```

use crate::axis::Axis;
use crate::consts::{
    DEFAULT_AXIS_BOUND, DEFAULT_CHANNEL_DIR, DEFAULT_LOG_DIR, DEFAULT_MOTOR_BINARY,
    DEFAULT_QUIT_GRACE_MS, DEFAULT_RESPAWN_TIMEOUT_MS, DEFAULT_TICK_MS,
    DEFAULT_WATCHDOG_TIMEOUT_S, TELEMETRY_DISPLAY_MAX, TELEMETRY_JITTER,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Equivalent `tracing` level.
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields shared by every hoist binary.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "hoist-bench-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance identifier, recorded in every log line.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "hoist".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cadences and deadlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Motor tick and renderer refresh interval.
    pub tick_ms: u64,
    /// Dead-man-switch window.
    pub watchdog_timeout_s: u64,
    /// How long a relaunched motor has to publish its identity.
    pub respawn_timeout_ms: u64,
    /// Commander pause between SHUTDOWN and exit.
    pub quit_grace_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            watchdog_timeout_s: DEFAULT_WATCHDOG_TIMEOUT_S,
            respawn_timeout_ms: DEFAULT_RESPAWN_TIMEOUT_MS,
            quit_grace_ms: DEFAULT_QUIT_GRACE_MS,
        }
    }
}

impl TimingConfig {
    #[inline]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    #[inline]
    pub fn watchdog_window(&self) -> Duration {
        Duration::from_secs(self.watchdog_timeout_s)
    }

    #[inline]
    pub fn respawn_timeout(&self) -> Duration {
        Duration::from_millis(self.respawn_timeout_ms)
    }

    #[inline]
    pub fn quit_grace(&self) -> Duration {
        Duration::from_millis(self.quit_grace_ms)
    }
}

/// Travel range of each axis, `[0, bound]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    pub x_bound: f32,
    pub z_bound: f32,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            x_bound: DEFAULT_AXIS_BOUND,
            z_bound: DEFAULT_AXIS_BOUND,
        }
    }
}

impl AxesConfig {
    /// Upper bound of `axis`.
    pub fn bound(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.x_bound,
            Axis::Z => self.z_bound,
        }
    }
}

/// Noise model applied to reported positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Half-width of the uniform perturbation.
    pub jitter: f32,
    /// Upper clamp of reported values.
    pub display_max: f32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            jitter: TELEMETRY_JITTER,
            display_max: TELEMETRY_DISPLAY_MAX,
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory hosting the channel FIFOs.
    pub channel_dir: PathBuf,
    /// Directory hosting `info.log` and `error.log`.
    pub log_dir: PathBuf,
    /// Motor executable relaunched after an emergency stop.
    pub motor_binary: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            channel_dir: PathBuf::from(DEFAULT_CHANNEL_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            motor_binary: PathBuf::from(DEFAULT_MOTOR_BINARY),
        }
    }
}

/// Complete hoist configuration.
///
/// # TOML Example
///
/// ```toml
/// [timing]
/// tick_ms = 500
///
/// [axes]
/// x_bound = 80.0
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HoistConfig {
    pub shared: SharedConfig,
    pub timing: TimingConfig,
    pub axes: AxesConfig,
    pub telemetry: TelemetryConfig,
    pub paths: PathsConfig,
}

impl HoistConfig {
    /// Load `path` when given, otherwise use defaults, then validate.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - an axis bound or `display_max` is not strictly positive
    /// - `tick_ms`, `watchdog_timeout_s` or `respawn_timeout_ms` is zero
    /// - `jitter` lies outside `[0, 0.5]`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        for axis in Axis::ALL {
            let bound = self.axes.bound(axis);
            if !(bound.is_finite() && bound > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{axis}_bound must be positive, got {bound}"
                )));
            }
        }
        if self.timing.tick_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tick_ms must be positive".to_string(),
            ));
        }
        if self.timing.watchdog_timeout_s == 0 {
            return Err(ConfigError::ValidationError(
                "watchdog_timeout_s must be positive".to_string(),
            ));
        }
        if self.timing.respawn_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "respawn_timeout_ms must be positive".to_string(),
            ));
        }
        if !(0.0..=TELEMETRY_JITTER).contains(&self.telemetry.jitter) {
            return Err(ConfigError::ValidationError(format!(
                "jitter must lie in [0, {TELEMETRY_JITTER}], got {}",
                self.telemetry.jitter
            )));
        }
        if !(self.telemetry.display_max.is_finite() && self.telemetry.display_max > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "display_max must be positive, got {}",
                self.telemetry.display_max
            )));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Any serde-deserializable struct can use ConfigLoader.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
