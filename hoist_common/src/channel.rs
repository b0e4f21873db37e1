//! Named FIFO channels carrying fixed-width protocol records.
//!
//! A channel is a POSIX FIFO in the channel directory. It is created on first
//! use by whichever side opens it first (`EEXIST` is success) and is never
//! removed by the actors.
//!
//! - [`ChannelReader`] opens the FIFO read-write. The open never blocks and the
//!   reader never observes end-of-file when writers come and go, so a motor
//!   that is killed and relaunched simply resumes the same stream.
//! - [`ChannelWriter`] opens write-only; the open blocks until a reader exists.
//! - [`identity`] implements the one-shot rendezvous used for identity records.
//!
//! Submodules:
//! - `names`: the well-known channel names.
//! - `identity`: publish/acquire handshakes.

pub mod identity;
pub mod names;

use crate::consts::{FIFO_MODE, RECORD_SIZE};
use crate::protocol::{ProtocolError, Record, WireRecord};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::stat::Mode;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

pub use names::ChannelDirectory;

/// Interval between attempts while waiting for a reader to appear.
const WRITER_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Which end of a channel a handle owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Reader end.
    Read,
    /// Writer end.
    Write,
}

/// Errors raised by channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// `mkfifo` failed for a reason other than "already exists".
    #[error("failed to create channel {path}: {source}")]
    Create {
        /// Channel path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The FIFO could not be opened.
    #[error("failed to open channel {path} for {direction:?}: {source}")]
    Open {
        /// Channel path.
        path: PathBuf,
        /// Requested end.
        direction: Direction,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Read, write or poll failed.
    #[error("I/O error on channel {path}: {source}")]
    Io {
        /// Channel path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// End-of-file: every writer closed a rendezvous channel before a full record arrived.
    #[error("channel {path} closed by peer")]
    Closed {
        /// Channel path.
        path: PathBuf,
    },

    /// Write to a channel that currently has no reader (`EPIPE`).
    #[error("channel {path} has no reader")]
    Disconnected {
        /// Channel path.
        path: PathBuf,
    },

    /// No record or peer arrived within the allowed time.
    #[error("timed out after {timeout:?} on channel {path}")]
    Timeout {
        /// Channel path.
        path: PathBuf,
        /// Time allowed.
        timeout: Duration,
    },

    /// A complete record arrived but could not be decoded.
    #[error("malformed record on channel {path}: {source}")]
    Protocol {
        /// Channel path.
        path: PathBuf,
        /// Decoding failure.
        #[source]
        source: ProtocolError,
    },
}

impl ChannelError {
    /// Whether the owning actor must terminate.
    ///
    /// Only malformed records are survivable: the stream stays record-aligned
    /// and the record is simply dropped.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ChannelError::Protocol { .. })
    }
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Create the FIFO at `path` unless it already exists.
pub fn ensure_fifo(path: &Path) -> ChannelResult<()> {
    match nix::unistd::mkfifo(path, Mode::from_bits_truncate(FIFO_MODE)) {
        Ok(()) => {
            debug!("Created channel {}", path.display());
            Ok(())
        }
        Err(Errno::EEXIST) => Ok(()),
        Err(errno) => Err(ChannelError::Create {
            path: path.to_path_buf(),
            source: errno.into(),
        }),
    }
}

/// Convert a duration to a poll timeout, saturating at the largest value `poll` accepts here.
fn poll_timeout(timeout: Duration) -> PollTimeout {
    let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
    PollTimeout::from(millis)
}

/// Wait until `fd` is readable. Returns `false` on timeout.
pub(crate) fn wait_readable(
    fd: BorrowedFd<'_>,
    timeout: PollTimeout,
    path: &Path,
) -> ChannelResult<bool> {
    let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
    loop {
        match poll(&mut fds, timeout) {
            Ok(0) => return Ok(false),
            Ok(_) => {
                let ready = fds[0]
                    .revents()
                    .is_some_and(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP));
                return Ok(ready);
            }
            Err(Errno::EINTR) => continue,
            Err(errno) => {
                return Err(ChannelError::Io {
                    path: path.to_path_buf(),
                    source: errno.into(),
                });
            }
        }
    }
}

/// Typed reader end of a channel.
#[derive(Debug)]
pub struct ChannelReader<R: Record> {
    file: File,
    path: PathBuf,
    _record: PhantomData<R>,
}

impl<R: Record> ChannelReader<R> {
    /// Create the channel if needed and open a long-lived reader.
    ///
    /// The FIFO is opened read-write, so this never blocks and the reader
    /// never sees end-of-file while waiting for (new) writers.
    pub fn open(path: impl Into<PathBuf>) -> ChannelResult<Self> {
        let path = path.into();
        ensure_fifo(&path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| ChannelError::Open {
                path: path.clone(),
                direction: Direction::Read,
                source,
            })?;
        trace!("Opened reader on {}", path.display());
        Ok(Self {
            file,
            path,
            _record: PhantomData,
        })
    }

    /// Open a read-only rendezvous end.
    ///
    /// With `nonblocking` the open returns immediately; otherwise it blocks
    /// until a writer appears.
    pub(crate) fn open_rendezvous(path: impl Into<PathBuf>, nonblocking: bool) -> ChannelResult<Self> {
        let path = path.into();
        ensure_fifo(&path)?;
        let mut options = OpenOptions::new();
        options.read(true);
        if nonblocking {
            options.custom_flags(libc::O_NONBLOCK);
        }
        let file = options.open(&path).map_err(|source| ChannelError::Open {
            path: path.clone(),
            direction: Direction::Read,
            source,
        })?;
        Ok(Self {
            file,
            path,
            _record: PhantomData,
        })
    }

    /// Channel path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&mut self) -> ChannelResult<WireRecord> {
        let mut raw = [0u8; RECORD_SIZE];
        self.file.read_exact(&mut raw).map_err(|source| {
            if source.kind() == io::ErrorKind::UnexpectedEof {
                ChannelError::Closed {
                    path: self.path.clone(),
                }
            } else {
                ChannelError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        Ok(raw)
    }

    /// Blocking read of exactly one record.
    pub fn recv(&mut self) -> ChannelResult<R> {
        let raw = self.read_raw()?;
        R::decode(&raw).map_err(|source| ChannelError::Protocol {
            path: self.path.clone(),
            source,
        })
    }

    /// Non-blocking read. `Ok(None)` means no record is available.
    pub fn try_recv(&mut self) -> ChannelResult<Option<R>> {
        if !wait_readable(self.file.as_fd(), PollTimeout::ZERO, &self.path)? {
            return Ok(None);
        }
        self.recv().map(Some)
    }

    /// Read one record, waiting at most `timeout`. `Ok(None)` on timeout.
    pub fn recv_timeout(&mut self, timeout: Duration) -> ChannelResult<Option<R>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if wait_readable(self.file.as_fd(), poll_timeout(remaining), &self.path)? {
                return self.recv().map(Some);
            }
            if remaining.is_zero() {
                return Ok(None);
            }
        }
    }

    /// Release the handle.
    pub fn close(self) {
        trace!("Closed reader on {}", self.path.display());
    }
}

impl<R: Record> AsFd for ChannelReader<R> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Typed writer end of a channel.
#[derive(Debug)]
pub struct ChannelWriter<R: Record> {
    file: File,
    path: PathBuf,
    _record: PhantomData<R>,
}

impl<R: Record> ChannelWriter<R> {
    /// Create the channel if needed and open the writer end.
    ///
    /// Blocks until the channel has a reader.
    pub fn open(path: impl Into<PathBuf>) -> ChannelResult<Self> {
        let path = path.into();
        ensure_fifo(&path)?;
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|source| ChannelError::Open {
                path: path.clone(),
                direction: Direction::Write,
                source,
            })?;
        trace!("Opened writer on {}", path.display());
        Ok(Self {
            file,
            path,
            _record: PhantomData,
        })
    }

    /// Like [`ChannelWriter::open`], but gives up if no reader appears within `timeout`.
    pub fn open_timeout(path: impl Into<PathBuf>, timeout: Duration) -> ChannelResult<Self> {
        let path = path.into();
        ensure_fifo(&path)?;
        let deadline = Instant::now() + timeout;
        let file = loop {
            let attempt = OpenOptions::new()
                .write(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(&path);
            match attempt {
                Ok(file) => break file,
                // ENXIO: no reader yet.
                Err(e) if e.raw_os_error() == Some(libc::ENXIO) => {
                    if Instant::now() >= deadline {
                        return Err(ChannelError::Timeout { path, timeout });
                    }
                    thread::sleep(WRITER_RETRY_INTERVAL);
                }
                Err(source) => {
                    return Err(ChannelError::Open {
                        path,
                        direction: Direction::Write,
                        source,
                    });
                }
            }
        };
        clear_nonblocking(&file).map_err(|source| ChannelError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            file,
            path,
            _record: PhantomData,
        })
    }

    /// Channel path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record.
    pub fn send(&mut self, record: &R) -> ChannelResult<()> {
        self.file.write_all(&record.encode()).map_err(|source| {
            if source.kind() == io::ErrorKind::BrokenPipe {
                ChannelError::Disconnected {
                    path: self.path.clone(),
                }
            } else {
                ChannelError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        trace!("Sent {:?} on {}", record, self.path.display());
        Ok(())
    }

    /// Release the handle.
    pub fn close(self) {
        trace!("Closed writer on {}", self.path.display());
    }
}

/// Switch an fd opened with `O_NONBLOCK` back to blocking writes.
fn clear_nonblocking(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
