//! Inbound commands to the application core.
//!
//! These represent operator actions (serial console, buttons) that the
//! [`Appliance`](super::service::Appliance) interprets and acts upon.

use chrono::NaiveDateTime;
use heapless::String;

use crate::biometric::{SensorInfo, VerifyOutcome};
use crate::registry::{truncated, UserId, NAME_LEN, PHONE_LEN};
use crate::timekeeping::Timestamp;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Capture a new finger and register it under `id`.
    Enroll {
        id: u8,
        name: String<NAME_LEN>,
        phone: String<PHONE_LEN>,
        notify: bool,
    },

    /// Poll for a finger a bounded number of times and report the result.
    Verify,

    /// Remove the template and the registry record at this id.
    Delete(u8),

    ListUsers,
    SensorInfo,

    /// Send a fixed text to the admin number.
    SendTestMessage,

    /// Dial the admin number.
    TestCall,

    ToggleAutoNotify,
    ToggleAutoVerify,
    ToggleBacklight,

    SetTime(NaiveDateTime),
    ShowTime,
}

impl AppCommand {
    /// Build an enroll command, truncating fields to their stored bounds.
    pub fn enroll(id: u8, name: &str, phone: &str, notify: bool) -> Self {
        Self::Enroll {
            id,
            name: truncated(name),
            phone: truncated(phone),
            notify,
        }
    }
}

/// What a command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Done,
    Enrolled(UserId),
    Verified(VerifyOutcome),
    Deleted(UserId),
    UserCount(usize),
    Sensor(SensorInfo),
    /// New state of the toggled setting.
    Toggled(bool),
    Time(Timestamp),
}
