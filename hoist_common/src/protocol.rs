//! Wire protocol shared by every channel.
//!
//! Every record is exactly [`RECORD_SIZE`] bytes: a little-endian `u32` tag
//! followed by a 4-byte little-endian payload. Records are far below
//! `PIPE_BUF`, so a single `write` of one record is atomic on a FIFO.
//!
//! | Tag    | Record                          | Payload       |
//! |--------|---------------------------------|---------------|
//! | `0x01` | [`MotorCommand::Velocity`]      | `f32` delta   |
//! | `0x02` | [`MotorCommand::Reset`]         | zero          |
//! | `0x03` | [`MotorCommand::Stop`]          | zero          |
//! | `0x04` | [`MotorCommand::Shutdown`]      | zero          |
//! | `0x20` | [`ControlMessage::Ping`]        | zero          |
//! | `0x21` | [`ControlMessage::EmergencyNotify`] | zero      |
//! | `0x22` | [`ControlMessage::ForcedReset`] | zero          |
//! | `0x23` | [`ControlMessage::Terminate`]   | zero          |
//! | `0x30` | [`Identity`]                    | `i32` pid     |
//! | `0x40` | [`Telemetry`]                   | `f32` position|
//!
//! Control commands are their own variants, so no velocity value can ever be
//! mistaken for a RESET/STOP/SHUTDOWN.

use crate::consts::RECORD_SIZE;
use static_assertions::const_assert;
use std::fmt;
use thiserror::Error;

const_assert!(RECORD_SIZE <= libc::PIPE_BUF);

/// Raw on-the-wire representation of one record.
pub type WireRecord = [u8; RECORD_SIZE];

/// Record tags.
pub mod tag {
    /// Velocity delta for a motor.
    pub const VELOCITY: u32 = 0x01;
    /// Motor RESET.
    pub const RESET: u32 = 0x02;
    /// Motor STOP (non-emergency).
    pub const STOP: u32 = 0x03;
    /// Motor SHUTDOWN.
    pub const SHUTDOWN: u32 = 0x04;
    /// Liveness ping for the watchdog.
    pub const PING: u32 = 0x20;
    /// Emergency stop in progress; motor identities are about to change.
    pub const EMERGENCY_NOTIFY: u32 = 0x21;
    /// Watchdog window expired; inspector must reset the motors.
    pub const FORCED_RESET: u32 = 0x22;
    /// Cooperative termination request.
    pub const TERMINATE: u32 = 0x23;
    /// Process identity.
    pub const IDENTITY: u32 = 0x30;
    /// Position estimate.
    pub const TELEMETRY: u32 = 0x40;
}

/// Decoding failures. None of these break record alignment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// Tag does not belong to any record family.
    #[error("unknown record tag {0:#04x}")]
    UnknownTag(u32),

    /// Tag is valid but belongs to another record family.
    #[error("expected {expected} record, found tag {found:#04x}")]
    UnexpectedRecord {
        /// Record family the channel carries.
        expected: &'static str,
        /// Tag that was received.
        found: u32,
    },

    /// A float payload was NaN or infinite.
    #[error("non-finite {field}: {value}")]
    NonFinite {
        /// Which payload was rejected.
        field: &'static str,
        /// The offending value.
        value: f32,
    },
}

/// A fixed-width record that can travel over a channel.
pub trait Record: Sized + Copy + fmt::Debug + Send + 'static {
    /// Family name used in diagnostics.
    const KIND: &'static str;

    /// Encode into the wire representation.
    fn encode(&self) -> WireRecord;

    /// Decode from the wire representation.
    fn decode(raw: &WireRecord) -> Result<Self, ProtocolError>;
}

#[inline]
fn pack(tag: u32, payload: [u8; 4]) -> WireRecord {
    let mut raw = [0u8; RECORD_SIZE];
    raw[..4].copy_from_slice(&tag.to_le_bytes());
    raw[4..].copy_from_slice(&payload);
    raw
}

#[inline]
fn unpack(raw: &WireRecord) -> (u32, [u8; 4]) {
    let mut tag = [0u8; 4];
    let mut payload = [0u8; 4];
    tag.copy_from_slice(&raw[..4]);
    payload.copy_from_slice(&raw[4..]);
    (u32::from_le_bytes(tag), payload)
}

fn family_of(tag: u32) -> Option<&'static str> {
    match tag {
        tag::VELOCITY | tag::RESET | tag::STOP | tag::SHUTDOWN => Some(MotorCommand::KIND),
        tag::PING | tag::EMERGENCY_NOTIFY | tag::FORCED_RESET | tag::TERMINATE => {
            Some(ControlMessage::KIND)
        }
        tag::IDENTITY => Some(Identity::KIND),
        tag::TELEMETRY => Some(Telemetry::KIND),
        _ => None,
    }
}

fn mismatch(expected: &'static str, found: u32) -> ProtocolError {
    match family_of(found) {
        Some(_) => ProtocolError::UnexpectedRecord { expected, found },
        None => ProtocolError::UnknownTag(found),
    }
}

fn finite(field: &'static str, value: f32) -> Result<f32, ProtocolError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProtocolError::NonFinite { field, value })
    }
}

/// Command carried on a motor's inbound channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCommand {
    /// Velocity delta accumulated into the current speed.
    Velocity(f32),
    /// Zero the speed and snap the position to the negative axis bound.
    Reset,
    /// Zero the speed and ignore velocity deltas until the next RESET.
    Stop,
    /// Release channels and exit cleanly.
    Shutdown,
}

impl Record for MotorCommand {
    const KIND: &'static str = "motor command";

    fn encode(&self) -> WireRecord {
        match *self {
            MotorCommand::Velocity(delta) => pack(tag::VELOCITY, delta.to_le_bytes()),
            MotorCommand::Reset => pack(tag::RESET, [0; 4]),
            MotorCommand::Stop => pack(tag::STOP, [0; 4]),
            MotorCommand::Shutdown => pack(tag::SHUTDOWN, [0; 4]),
        }
    }

    fn decode(raw: &WireRecord) -> Result<Self, ProtocolError> {
        let (tag, payload) = unpack(raw);
        match tag {
            tag::VELOCITY => {
                finite("velocity delta", f32::from_le_bytes(payload)).map(MotorCommand::Velocity)
            }
            tag::RESET => Ok(MotorCommand::Reset),
            tag::STOP => Ok(MotorCommand::Stop),
            tag::SHUTDOWN => Ok(MotorCommand::Shutdown),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}

/// Out-of-band control message between supervisory actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Liveness ping; disarms the watchdog for the current window.
    Ping,
    /// Emergency stop in progress; the watchdog must resync motor identities.
    EmergencyNotify,
    /// Watchdog window expired without a ping.
    ForcedReset,
    /// Orderly termination of the receiving actor.
    Terminate,
}

impl Record for ControlMessage {
    const KIND: &'static str = "control";

    fn encode(&self) -> WireRecord {
        let tag = match self {
            ControlMessage::Ping => tag::PING,
            ControlMessage::EmergencyNotify => tag::EMERGENCY_NOTIFY,
            ControlMessage::ForcedReset => tag::FORCED_RESET,
            ControlMessage::Terminate => tag::TERMINATE,
        };
        pack(tag, [0; 4])
    }

    fn decode(raw: &WireRecord) -> Result<Self, ProtocolError> {
        match unpack(raw).0 {
            tag::PING => Ok(ControlMessage::Ping),
            tag::EMERGENCY_NOTIFY => Ok(ControlMessage::EmergencyNotify),
            tag::FORCED_RESET => Ok(ControlMessage::ForcedReset),
            tag::TERMINATE => Ok(ControlMessage::Terminate),
            other => Err(mismatch(Self::KIND, other)),
        }
    }
}

/// Process identifier published so that peers can address the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity {
    /// OS process id.
    pub pid: i32,
}

impl Identity {
    /// Identity of the calling process.
    pub fn current() -> Self {
        Self {
            pid: std::process::id() as i32,
        }
    }

    /// As a `nix` pid, for signalling.
    #[inline]
    pub fn as_pid(self) -> nix::unistd::Pid {
        nix::unistd::Pid::from_raw(self.pid)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.pid)
    }
}

impl Record for Identity {
    const KIND: &'static str = "identity";

    fn encode(&self) -> WireRecord {
        pack(tag::IDENTITY, self.pid.to_le_bytes())
    }

    fn decode(raw: &WireRecord) -> Result<Self, ProtocolError> {
        match unpack(raw) {
            (tag::IDENTITY, payload) => Ok(Self {
                pid: i32::from_le_bytes(payload),
            }),
            (other, _) => Err(mismatch(Self::KIND, other)),
        }
    }
}

/// Position estimate reported by a motor once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// Reported position, already clamped for display.
    pub position: f32,
}

impl Record for Telemetry {
    const KIND: &'static str = "telemetry";

    fn encode(&self) -> WireRecord {
        pack(tag::TELEMETRY, self.position.to_le_bytes())
    }

    fn decode(raw: &WireRecord) -> Result<Self, ProtocolError> {
        match unpack(raw) {
            (tag::TELEMETRY, payload) => Ok(Self {
                position: finite("telemetry position", f32::from_le_bytes(payload))?,
            }),
            (other, _) => Err(mismatch(Self::KIND, other)),
        }
    }
}
