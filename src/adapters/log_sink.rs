//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                sensor_capacity,
                modem_ready,
                clock_present,
                clock_seeded,
            } => {
                info!(
                    "START | sensor_capacity={} | gsm={} | rtc={}{}",
                    sensor_capacity,
                    if *modem_ready { "ready" } else { "offline" },
                    if *clock_present { "ok" } else { "absent" },
                    if *clock_seeded { " (seeded from build time)" } else { "" },
                );
            }
            AppEvent::Access(a) => match a.id {
                Some(id) if a.granted => info!("ACCESS | granted id=#{} | {}", id, a.timestamp),
                _ => info!("ACCESS | denied | {}", a.timestamp),
            },
            AppEvent::ScanFailed(e) => warn!("SCAN | {}", e),
            AppEvent::Notified(r) => {
                info!("NOTIFY | sent {}/{}", r.sent, r.attempted);
            }
            AppEvent::NotifySuppressed(id) => info!("NOTIFY | repeat of #{} suppressed", id),
            AppEvent::NotifyFailed(e) => warn!("NOTIFY | {}", e),
            AppEvent::EnrollProgress(stage) => info!("ENROLL | {}", stage),
            AppEvent::Enrolled(id) => info!("ENROLL | #{} stored", id),
            AppEvent::EnrollFailed { id, error } => warn!("ENROLL | #{} failed: {}", id, error),
            AppEvent::Deleted(id) => info!("DELETE | #{}", id),
            AppEvent::DeleteFailed { id, error } => warn!("DELETE | #{} failed: {}", id, error),
            AppEvent::SettingChanged { setting, enabled } => {
                info!("SETTING | {:?}={}", setting, enabled);
            }
            AppEvent::ClockSet(at) => info!("CLOCK | set to {}", at),
        }
    }
}
