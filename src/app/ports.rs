//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Appliance (domain)
//! ```
//!
//! Driven adapters (fingerprint sensor, calendar clock, display, modem,
//! event sinks) implement these traits.  The
//! [`Appliance`](super::service::Appliance) and the engines it owns consume
//! them via generics, so the domain core never touches a UART or I²C bus
//! directly.
//!
//! The byte-stream port used by both serial peripherals lives in
//! [`crate::transport`].

use core::fmt;

use chrono::NaiveDateTime;

use crate::error::{ClockError, TransportError};
use crate::registry::UserId;

// ───────────────────────────────────────────────────────────────
// Fingerprint sensor port
// ───────────────────────────────────────────────────────────────

/// Non-OK status reported by the sensor for a single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCode {
    /// The sensor could not parse the command packet.
    PacketError,
    /// No finger on the glass.
    NoFinger,
    /// A finger is present but the image could not be taken.
    ImageFail,
    /// The image is too disordered to extract features.
    ImageMessy,
    /// Too few feature points in the image.
    FeatureFail,
    /// Search ran to completion without a match.
    NotFound,
    /// The two character buffers do not describe the same finger.
    EnrollMismatch,
    /// The page id is outside the template library.
    BadLocation,
    /// The template could not be deleted (or the slot was empty).
    DeleteFail,
    /// No valid primary image in the image buffer.
    InvalidImage,
    /// Error writing the template flash.
    FlashError,
    /// Password handshake rejected.
    WrongPassword,
    /// The serial link failed: no reply, timeout or corrupt packet.
    Link,
    /// Any confirmation code this firmware does not interpret.
    Other(u8),
}

impl SensorCode {
    /// Interpret a raw confirmation byte. `0x00` (OK) is not a status and
    /// maps to `None`.
    pub fn from_confirmation(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => return None,
            0x01 => Self::PacketError,
            0x02 => Self::NoFinger,
            0x03 => Self::ImageFail,
            0x06 => Self::ImageMessy,
            0x07 => Self::FeatureFail,
            0x09 => Self::NotFound,
            0x0A => Self::EnrollMismatch,
            0x0B => Self::BadLocation,
            0x10 => Self::DeleteFail,
            0x13 => Self::WrongPassword,
            0x15 => Self::InvalidImage,
            0x18 => Self::FlashError,
            other => Self::Other(other),
        })
    }
}

impl fmt::Display for SensorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PacketError => write!(f, "packet receive error"),
            Self::NoFinger => write!(f, "no finger"),
            Self::ImageFail => write!(f, "imaging error"),
            Self::ImageMessy => write!(f, "image too messy"),
            Self::FeatureFail => write!(f, "feature extraction failed"),
            Self::NotFound => write!(f, "no match"),
            Self::EnrollMismatch => write!(f, "samples inconsistent"),
            Self::BadLocation => write!(f, "bad template location"),
            Self::DeleteFail => write!(f, "delete failed"),
            Self::InvalidImage => write!(f, "invalid image"),
            Self::FlashError => write!(f, "flash write error"),
            Self::WrongPassword => write!(f, "wrong password"),
            Self::Link => write!(f, "link failure"),
            Self::Other(code) => write!(f, "code 0x{code:02X}"),
        }
    }
}

/// On-sensor feature buffer used by conversion and model creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CharBuffer {
    One = 1,
    Two = 2,
}

/// Successful search result.  `confidence` is ordinal only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub page: u16,
    pub confidence: u16,
}

/// System parameters reported by the sensor (diagnostics only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorParameters {
    pub status: u16,
    pub system_id: u16,
    pub capacity: u16,
    pub security_level: u16,
    pub device_address: u32,
    pub packet_len: u16,
    pub baud_multiplier: u16,
}

/// The sensor boundary.  Feature extraction and matching happen inside the
/// sensor; this firmware only ever refers to templates by page id.
pub trait FingerprintSensor {
    /// Handshake: proves a sensor is attached and accepts our password.
    fn verify_password(&mut self) -> Result<(), SensorCode>;

    /// Take one image into the image buffer.
    fn capture_image(&mut self) -> Result<(), SensorCode>;

    /// Convert the image buffer into a feature set in `buffer`.
    fn convert_image(&mut self, buffer: CharBuffer) -> Result<(), SensorCode>;

    /// Combine both character buffers into a composite model.
    fn create_model(&mut self) -> Result<(), SensorCode>;

    /// Write the composite model to the template library at `id`.
    fn store_model(&mut self, id: UserId) -> Result<(), SensorCode>;

    /// Search the whole library with the feature set in buffer one.
    fn search(&mut self) -> Result<SearchHit, SensorCode>;

    /// Remove the template at `id`.
    fn delete_model(&mut self, id: UserId) -> Result<(), SensorCode>;

    /// Whether the library holds a template at `id`.
    fn slot_occupied(&mut self, id: UserId) -> Result<bool, SensorCode>;

    /// Number of stored templates.
    fn template_count(&mut self) -> Result<u16, SensorCode>;

    /// Sensor system parameters.
    fn parameters(&mut self) -> Result<SensorParameters, SensorCode>;
}

// ───────────────────────────────────────────────────────────────
// Time ports
// ───────────────────────────────────────────────────────────────

/// Monotonic time since boot.  Blocking delays come from
/// [`embedded_hal::delay::DelayNs`], which every timer adapter also implements.
pub trait Uptime {
    fn uptime_ms(&self) -> u64;
}

/// Battery-backed calendar clock (DS3231 or simulation).
pub trait CalendarClock {
    fn now(&mut self) -> Result<NaiveDateTime, ClockError>;

    /// Overwrite the clock and clear the lost-reference flag.
    fn adjust(&mut self, at: NaiveDateTime) -> Result<(), ClockError>;

    /// `true` if the oscillator stopped since the last `adjust` (backup
    /// power removed).
    fn lost_reference(&mut self) -> Result<bool, ClockError>;

    /// Die temperature in °C.
    fn temperature(&mut self) -> Result<f32, ClockError>;
}

// ───────────────────────────────────────────────────────────────
// Display port (consumed, never read back)
// ───────────────────────────────────────────────────────────────

/// Character display.  Layout (centering, scrolling) is the adapter's job.
pub trait DisplayPort {
    /// Replace the screen with up to four lines.  Extra lines are dropped.
    fn show(&mut self, lines: &[&str]);

    fn set_backlight(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Messaging port
// ───────────────────────────────────────────────────────────────

/// Outbound text/voice channel.  Implemented by the modem driver; the
/// notification layer depends only on this trait.
pub trait MessageSender {
    /// Startup handshake completed.
    fn is_ready(&self) -> bool;

    /// Submit one text message.  No retry.
    fn send_message(&mut self, destination: &str, body: &str) -> Result<(), TransportError>;

    /// Dial `destination` and return without waiting for call progress.
    fn place_call(&mut self, destination: &str) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
