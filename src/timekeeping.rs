//! Time source — calendar timestamps with an uptime fallback.
//!
//! When the RTC is missing or a read fails, [`TimeSource::now`] returns
//! [`Timestamp::Uptime`], which renders as `"<secs>s"`.  That label can
//! never be mistaken for a calendar time, so message readers always know
//! which kind of time they are looking at.
//!
//! After the RTC loses backup power it is seeded with the firmware build
//! time.  The result is plausible but stale until an operator sets it.

use core::fmt;

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Timelike};
use log::{info, warn};

use crate::app::ports::{CalendarClock, Uptime};
use crate::error::ClockError;

/// Unix seconds at which this firmware was built (see `build.rs`).
const BUILD_EPOCH: &str = env!("FPACCESS_BUILD_EPOCH");

/// Firmware build time, used to seed an RTC that lost its reference.
pub fn build_timestamp() -> NaiveDateTime {
    BUILD_EPOCH
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Wall-clock time from the RTC.
    Calendar(NaiveDateTime),
    /// Degraded mode: seconds since boot.
    Uptime(u64),
}

impl Timestamp {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Uptime(_))
    }

    /// `HH:MM:SS` part of a calendar timestamp.
    pub fn time_of_day(&self) -> Option<TimeOfDay> {
        match self {
            Self::Calendar(dt) => Some(TimeOfDay(dt.time())),
            Self::Uptime(_) => None,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calendar(dt) => write!(
                f,
                "{:04}-{:02}-{:02} {}",
                dt.year(),
                dt.month(),
                dt.day(),
                TimeOfDay(dt.time())
            ),
            Self::Uptime(secs) => write!(f, "{secs}s"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay(pub NaiveTime);

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0.hour(),
            self.0.minute(),
            self.0.second()
        )
    }
}

// ---------------------------------------------------------------------------
// TimeSource
// ---------------------------------------------------------------------------

pub struct TimeSource<K, U> {
    clock: Option<K>,
    uptime: U,
}

impl<K, U> TimeSource<K, U>
where
    K: CalendarClock,
    U: Uptime,
{
    /// `clock` is `None` when no RTC answered on the bus.
    pub fn new(clock: Option<K>, uptime: U) -> Self {
        Self { clock, uptime }
    }

    /// Boot-time check.  Seeds the RTC with the build time if it lost its
    /// reference and returns whether it did so.  An absent clock is
    /// reported but leaves the source usable in degraded mode.
    pub fn begin(&mut self) -> Result<bool, ClockError> {
        let Some(clock) = self.clock.as_mut() else {
            warn!("rtc: not found, timestamps fall back to uptime");
            return Err(ClockError::Absent);
        };
        if !clock.lost_reference()? {
            info!("rtc: running");
            return Ok(false);
        }
        let seed = build_timestamp();
        warn!("rtc: lost power, seeding with build time {}", Timestamp::Calendar(seed));
        clock.adjust(seed)?;
        Ok(true)
    }

    /// Current time, or uptime seconds if the RTC is unavailable.
    pub fn now(&mut self) -> Timestamp {
        if let Some(clock) = self.clock.as_mut() {
            match clock.now() {
                Ok(dt) => return Timestamp::Calendar(dt),
                Err(e) => warn!("rtc: read failed ({e})"),
            }
        }
        Timestamp::Uptime(self.uptime.uptime_ms() / 1000)
    }

    /// Operator override.  Always accepted while an RTC is present.
    pub fn set_time(&mut self, at: NaiveDateTime) -> Result<(), ClockError> {
        let clock = self.clock.as_mut().ok_or(ClockError::Absent)?;
        clock.adjust(at)?;
        info!("rtc: set to {}", Timestamp::Calendar(at));
        Ok(())
    }

    /// RTC die temperature in °C.
    pub fn temperature(&mut self) -> Result<f32, ClockError> {
        self.clock.as_mut().ok_or(ClockError::Absent)?.temperature()
    }

    pub fn has_clock(&self) -> bool {
        self.clock.is_some()
    }
}
