//! Shared append-only log files.
//!
//! Every actor appends to the same two files in the log directory:
//!
//! - `info.log`: every event at or above the configured level.
//! - `error.log`: `ERROR` events only.
//!
//! Several processes write concurrently, so each formatted line is buffered
//! and appended while holding an exclusive `flock` on the file. The terminal
//! is never written to; it belongs to the actor's UI.

use crate::config::HoistConfig;
use crate::consts::{ERROR_LOG_FILE, INFO_LOG_FILE};
use crate::role::Role;
use nix::fcntl::{Flock, FlockArg};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::Level;
use tracing::span::EnteredSpan;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Logger initialization failures.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log directory could not be created.
    #[error("failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another global subscriber is already installed.
    #[error("failed to install log subscriber: {0}")]
    Install(#[from] SetGlobalDefaultError),
}

/// Keeps the per-actor span entered for the lifetime of `main`.
#[must_use = "dropping the guard leaves the actor span"]
pub struct LogGuard {
    _span: EnteredSpan,
}

/// Install the global subscriber for `role` and enter its `actor` span.
///
/// `verbose` forces `DEBUG`; otherwise the configured level applies.
/// `RUST_LOG` directives are honoured on top of either.
pub fn init(config: &HoistConfig, role: Role, verbose: bool, json: bool) -> Result<LogGuard, LogError> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.shared.log_level.as_tracing()
    };
    let subscriber = build_subscriber(&config.paths.log_dir, level, json)?;
    tracing::subscriber::set_global_default(subscriber)?;

    let span = tracing::info_span!(
        "actor",
        service = %config.shared.service_name,
        role = %role
    );
    Ok(LogGuard {
        _span: span.entered(),
    })
}

/// Build the two-file subscriber without installing it.
pub fn build_subscriber(
    log_dir: &Path,
    level: Level,
    json: bool,
) -> Result<Box<dyn tracing::Subscriber + Send + Sync>, LogError> {
    std::fs::create_dir_all(log_dir).map_err(|source| LogError::Directory {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let info = file_layer(LockedAppender::new(log_dir.join(INFO_LOG_FILE)), json).with_filter(filter);
    let errors = file_layer(LockedAppender::new(log_dir.join(ERROR_LOG_FILE)), json)
        .with_filter(LevelFilter::ERROR);

    Ok(Box::new(
        tracing_subscriber::registry().with(info).with(errors),
    ))
}

fn file_layer<S>(writer: LockedAppender, json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

/// Append `bytes` to `path` under an exclusive advisory lock.
pub fn append_locked(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut locked = Flock::lock(file, FlockArg::LockExclusive)
        .map_err(|(_, errno)| io::Error::from(errno))?;
    locked.write_all(bytes)?;
    locked.flush()
}

/// `MakeWriter` producing one [`LockedLine`] per event.
#[derive(Debug, Clone)]
pub struct LockedAppender {
    path: Arc<PathBuf>,
}

impl LockedAppender {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }
}

impl<'a> MakeWriter<'a> for LockedAppender {
    type Writer = LockedLine;

    fn make_writer(&'a self) -> Self::Writer {
        LockedLine {
            path: Arc::clone(&self.path),
            buf: Vec::with_capacity(256),
        }
    }
}

/// Buffers one formatted event and appends it on drop.
#[derive(Debug)]
pub struct LockedLine {
    path: Arc<PathBuf>,
    buf: Vec<u8>,
}

impl Write for LockedLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LockedLine {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        if let Err(e) = append_locked(&self.path, &self.buf) {
            eprintln!("log append to {} failed: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn concurrent_lines_stay_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("info.log");
        let appender = LockedAppender::new(&path);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let appender = appender.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        let mut line = appender.make_writer();
                        write!(line, "thread-{t} line-{i} ").unwrap();
                        writeln!(line, "{}", "x".repeat(64)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 8 * 50);
        for line in lines {
            assert!(line.starts_with("thread-"), "torn line: {line}");
            assert!(line.ends_with(&"x".repeat(64)), "torn line: {line}");
        }
    }

    #[test]
    fn errors_reach_both_files() {
        let dir = TempDir::new().unwrap();
        let subscriber = build_subscriber(dir.path(), Level::INFO, false).unwrap();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("motor ready");
            tracing::debug!("hidden below info");
            tracing::error!("channel failed");
        });

        let info = std::fs::read_to_string(dir.path().join(INFO_LOG_FILE)).unwrap();
        let errors = std::fs::read_to_string(dir.path().join(ERROR_LOG_FILE)).unwrap();
        assert!(info.contains("motor ready"));
        assert!(info.contains("channel failed"));
        assert!(!info.contains("hidden below info"));
        assert!(errors.contains("channel failed"));
        assert!(!errors.contains("motor ready"));
    }
}
