//! Closed error taxonomy for the gateway core.
//!
//! Startup errors ([`ConfigError`]) are meant to propagate all the way out
//! of system construction. Runtime errors ([`DecodeError`], [`EasingError`])
//! are isolated to the offending frame or command and are typically logged
//! by the caller rather than propagated further.

use thiserror::Error;

/// Fatal at startup; returned by [`crate::config::Configuration::validate`]
/// and [`crate::system::System::new`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("duplicate device: family={family:?} bus_id={bus_id}")]
    DuplicateDevice {
        family: crate::device::DeviceFamily,
        bus_id: u8,
    },

    #[error("unknown device family: {0:?}")]
    UnknownDeviceType(String),

    #[error("invalid slot name: {0:?}")]
    InvalidSlot(String),

    #[error("duplicate entity id: {0}")]
    DuplicateEntityId(String),

    #[error("slot {slot:?} is assigned to both a light and a switch")]
    SlotAssignedTwice { slot: String },

    #[error("bus_id {0} out of range, expected 0..=15")]
    BusIdOutOfRange(u8),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),
}

/// Frame-local decode failure. The frame is dropped; no state change occurs.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    #[error("short frame: expected 8 bytes, got {0}")]
    ShortFrame(usize),
}

/// Returned synchronously to a command caller; no state change occurs.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("unknown easing function: {0}")]
pub struct EasingError(pub String);

/// Non-fatal: logged and retried on the next persistence tick.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error persisting state: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}
