//! Unified error types for the FpAccess firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform. All variants are `Copy` so they
//! can be passed through the orchestrator and event sink without allocation.

use core::fmt;

use crate::app::ports::SensorCode;
use crate::biometric::EnrollStage;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Fingerprint capture, enrollment, search or deletion failed.
    Biometric(BiometricError),
    /// The cellular modem exchange failed.
    Transport(TransportError),
    /// The calendar clock is missing or its bus failed.
    Clock(ClockError),
    /// A user registry operation was rejected.
    Registry(RegistryError),
    /// A notification could not be routed.
    Notify(NotifyError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Biometric(e) => write!(f, "biometric: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Clock(e) => write!(f, "clock: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Notify(e) => write!(f, "notify: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Biometric errors
// ---------------------------------------------------------------------------

/// Failure exits of the enroll / verify / delete state machines.
///
/// Each variant carries the sensor status that caused it, so a caller can
/// tell "no finger yet" apart from a real hardware fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricError {
    /// Image capture failed (or found no finger during a single-shot poll).
    Capture(SensorCode),
    /// The captured image could not be converted into a feature set.
    Conversion(SensorCode),
    /// The two enrollment samples do not belong to the same finger.
    Mismatch,
    /// The composite model could not be written to the template store.
    Store(SensorCode),
    /// The template could not be removed.
    Delete(SensorCode),
    /// Delete was asked for a slot that holds no template.
    EmptySlot,
    /// A bounded wait expired during the given enrollment stage.
    Timeout(EnrollStage),
    /// Any other sensor exchange failed (handshake, count, parameters).
    Sensor(SensorCode),
}

impl BiometricError {
    /// `true` when a single-shot verify poll simply found no finger.
    pub fn is_no_finger(&self) -> bool {
        matches!(self, Self::Capture(SensorCode::NoFinger))
    }
}

impl fmt::Display for BiometricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture(code) => write!(f, "image capture failed ({code})"),
            Self::Conversion(code) => write!(f, "image conversion failed ({code})"),
            Self::Mismatch => write!(f, "fingerprints did not match"),
            Self::Store(code) => write!(f, "template store failed ({code})"),
            Self::Delete(code) => write!(f, "template delete failed ({code})"),
            Self::EmptySlot => write!(f, "no template stored at that id"),
            Self::Timeout(stage) => write!(f, "timed out while {stage}"),
            Self::Sensor(code) => write!(f, "sensor exchange failed ({code})"),
        }
    }
}

impl From<BiometricError> for Error {
    fn from(e: BiometricError) -> Self {
        Self::Biometric(e)
    }
}

// ---------------------------------------------------------------------------
// Transport (modem) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The startup handshake (text-mode acknowledgement) never completed.
    NotReady,
    /// The expected token did not arrive before the deadline.
    Timeout,
    /// The underlying byte stream rejected a write.
    Write,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "modem not ready"),
            Self::Timeout => write!(f, "modem response timed out"),
            Self::Write => write!(f, "modem write failed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Clock errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// No calendar clock was detected at boot.
    Absent,
    /// The clock bus transaction failed.
    Bus,
    /// The clock returned a register image that is not a valid date.
    InvalidTime,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "RTC not present"),
            Self::Bus => write!(f, "RTC bus error"),
            Self::InvalidTime => write!(f, "RTC returned an invalid time"),
        }
    }
}

impl From<ClockError> for Error {
    fn from(e: ClockError) -> Self {
        Self::Clock(e)
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Id outside `1..=127`.
    InvalidId(u8),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId(id) => write!(f, "invalid user id {id}"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    /// No admin number is configured.
    NoRecipient,
    /// The messaging transport refused or failed the send.
    Transport(TransportError),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRecipient => write!(f, "no admin phone configured"),
            Self::Transport(e) => write!(f, "{e}"),
        }
    }
}

impl From<TransportError> for NotifyError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<NotifyError> for Error {
    fn from(e: NotifyError) -> Self {
        Self::Notify(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
