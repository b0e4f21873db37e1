//! One-shot identity rendezvous.
//!
//! The publisher opens the identity channel write-only (blocking until the
//! consumer is present), writes one [`Identity`] record and closes. The
//! consumer opens read-only, reads exactly one record and closes. Each
//! exchange is independent, so a relaunched actor can simply publish again.

use super::{ChannelError, ChannelReader, ChannelResult, ChannelWriter};
use crate::protocol::Identity;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Publish `identity` on `path`. Blocks until the consumer opens the channel.
pub fn publish(path: &Path, identity: Identity) -> ChannelResult<()> {
    let mut writer = ChannelWriter::<Identity>::open(path)?;
    writer.send(&identity)?;
    debug!("Published {} on {}", identity, path.display());
    Ok(())
}

/// Acquire one identity from `path`. Blocks until a publisher shows up.
pub fn acquire(path: &Path) -> ChannelResult<Identity> {
    let mut reader = ChannelReader::<Identity>::open_rendezvous(path, false)?;
    let identity = reader.recv()?;
    debug!("Acquired {} from {}", identity, path.display());
    Ok(identity)
}

/// Acquire one identity from `path`, giving up after `timeout`.
pub fn acquire_timeout(path: &Path, timeout: Duration) -> ChannelResult<Identity> {
    let mut reader = ChannelReader::<Identity>::open_rendezvous(path, true)?;
    match reader.recv_timeout(timeout)? {
        Some(identity) => {
            debug!("Acquired {} from {}", identity, path.display());
            Ok(identity)
        }
        None => Err(ChannelError::Timeout {
            path: path.to_path_buf(),
            timeout,
        }),
    }
}
