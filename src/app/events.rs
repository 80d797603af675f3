//! Outbound application events.
//!
//! The [`Appliance`](super::service::Appliance) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::biometric::EnrollStage;
use crate::error::{BiometricError, NotifyError};
use crate::notify::{AccessEvent, DeliveryReport};
use crate::registry::UserId;
use crate::timekeeping::Timestamp;

/// Operator-switchable behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    AutoNotify,
    AutoVerify,
    Backlight,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Boot finished; the sensor answered.
    Started {
        sensor_capacity: u16,
        modem_ready: bool,
        clock_present: bool,
        clock_seeded: bool,
    },

    /// A finger was scanned and resolved to granted or denied.
    Access(AccessEvent),

    /// A scan failed for a reason other than "no finger".
    ScanFailed(BiometricError),

    /// Notifications for an access were sent (possibly partially).
    Notified(DeliveryReport),

    /// Notifications for a repeat scan were skipped.
    NotifySuppressed(UserId),

    /// Notifications could not be routed at all.
    NotifyFailed(NotifyError),

    /// An enrollment stage started.
    EnrollProgress(EnrollStage),

    Enrolled(UserId),
    EnrollFailed { id: UserId, error: BiometricError },

    Deleted(UserId),
    DeleteFailed { id: UserId, error: BiometricError },

    SettingChanged { setting: Setting, enabled: bool },

    ClockSet(Timestamp),
}
