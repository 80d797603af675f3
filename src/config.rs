//! System configuration parameters
//!
//! All tunable parameters for the FpAccess appliance.  Defaults match the
//! timings the modem and sensor are known to tolerate; a JSON blob can
//! override any subset of them.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Notification policy ---
    /// Number that receives every admin message.  Empty disables them.
    pub admin_phone: heapless::String<15>,
    /// Send notifications for scans picked up by the control loop.
    pub auto_notify: bool,
    /// Poll the sensor from the control loop.
    pub auto_verify: bool,

    // --- Modem ---
    /// Default AT-command response timeout (milliseconds)
    pub command_timeout_ms: u32,
    /// Wait for the completion token after a message payload (milliseconds)
    pub message_timeout_ms: u32,
    /// Settle after the addressing frame before the payload (milliseconds)
    pub address_settle_ms: u32,
    /// Settle after the payload before the terminator byte (milliseconds)
    pub payload_settle_ms: u32,
    /// Settle after a dial command (milliseconds)
    pub dial_settle_ms: u32,
    /// Wait for the signal-quality report during the handshake (milliseconds)
    pub signal_query_ms: u32,

    // --- Fingerprint sensor ---
    /// Sensor handshake password
    pub sensor_password: u32,
    /// Maximum wait for a finger at each enrollment image stage (milliseconds)
    pub capture_timeout_ms: u32,
    /// Pause after the first enrollment image (milliseconds)
    pub removal_delay_ms: u32,
    /// Maximum wait for the finger to leave the glass (milliseconds)
    pub removal_timeout_ms: u32,
    /// Pause between image polls (milliseconds)
    pub image_poll_interval_ms: u32,
    /// Single-shot polls made by an operator verify request
    pub verify_attempts: u8,

    // --- Control loop ---
    /// Delay between sensor scans (milliseconds)
    pub scan_interval_ms: u32,
    /// Same identity seen again within this window is not re-notified (milliseconds)
    pub duplicate_window_ms: u32,

    // --- Serial links ---
    pub sensor_baud: u32,
    pub modem_baud: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            admin_phone: heapless::String::new(),
            auto_notify: true,
            auto_verify: true,

            // Modem
            command_timeout_ms: 1_000,
            message_timeout_ms: 10_000,
            address_settle_ms: 500,
            payload_settle_ms: 100,
            dial_settle_ms: 1_000,
            signal_query_ms: 500,

            // Sensor
            sensor_password: 0,
            capture_timeout_ms: 15_000,
            removal_delay_ms: 2_000,
            removal_timeout_ms: 10_000,
            image_poll_interval_ms: 50,
            verify_attempts: 10,

            // Control loop
            scan_interval_ms: 100,
            duplicate_window_ms: 10_000,

            sensor_baud: 57_600,
            modem_baud: 9_600,
        }
    }
}

impl SystemConfig {
    /// Reject settings that would make a bounded wait unbounded or
    /// instantaneous, and admin numbers the modem cannot dial.
    pub fn validate(&self) -> Result<(), Error> {
        let timeouts = [
            self.command_timeout_ms,
            self.message_timeout_ms,
            self.capture_timeout_ms,
            self.removal_timeout_ms,
            self.image_poll_interval_ms,
        ];
        if timeouts.contains(&0) {
            return Err(Error::Config("timeouts must be non-zero"));
        }
        if self.verify_attempts == 0 {
            return Err(Error::Config("verify_attempts must be at least 1"));
        }
        if self.sensor_baud == 0 || self.modem_baud == 0 {
            return Err(Error::Config("baud rates must be non-zero"));
        }
        if !is_dialable(&self.admin_phone) {
            return Err(Error::Config("admin_phone may only contain '+' and digits"));
        }
        Ok(())
    }

    /// Parse a (possibly partial) JSON override and validate the result.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }
}

/// `+` is only allowed as the leading character.
pub(crate) fn is_dialable(number: &str) -> bool {
    let digits = number.strip_prefix('+').unwrap_or(number);
    digits.bytes().all(|b| b.is_ascii_digit())
}
