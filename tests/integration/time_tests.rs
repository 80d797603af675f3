//! Time source behaviour: lost reference, absent clock, operator set.

use fpaccess::error::ClockError;
use fpaccess::timekeeping::{build_timestamp, TimeSource, Timestamp};

use crate::mock_hw::{datetime, SimClock, StepTimer};

#[test]
fn lost_reference_seeds_build_time() {
    let clock = SimClock::lost_power();
    let mut time = TimeSource::new(Some(clock.clone()), StepTimer::new());

    assert_eq!(time.begin(), Ok(true));
    assert_eq!(clock.now(), build_timestamp());
    assert_eq!(time.now(), Timestamp::Calendar(build_timestamp()));
    assert!(!clock.0.borrow().lost);
}

#[test]
fn running_clock_is_left_alone() {
    let at = datetime(2025, 6, 1, 8, 30, 0);
    let clock = SimClock::at(at);
    let mut time = TimeSource::new(Some(clock.clone()), StepTimer::new());

    assert_eq!(time.begin(), Ok(false));
    assert!(clock.0.borrow().adjustments.is_empty());
    assert_eq!(time.now().to_string(), "2025-06-01 08:30:00");
}

#[test]
fn absent_clock_falls_back_to_uptime() {
    let timer = StepTimer::new();
    let mut time: TimeSource<SimClock, _> = TimeSource::new(None, timer.clone());

    assert_eq!(time.begin(), Err(ClockError::Absent));
    timer.advance(61_500);
    let now = time.now();
    assert!(now.is_degraded());
    assert_eq!(now.to_string(), "61s");
    assert_eq!(time.set_time(datetime(2025, 1, 1, 0, 0, 0)), Err(ClockError::Absent));
}

#[test]
fn failed_read_degrades_that_reading_only() {
    let clock = SimClock::at(datetime(2025, 6, 1, 8, 30, 0));
    let timer = StepTimer::new();
    let mut time = TimeSource::new(Some(clock.clone()), timer.clone());
    timer.advance(3_000);

    clock.0.borrow_mut().broken = true;
    assert_eq!(time.now(), Timestamp::Uptime(3));
    clock.0.borrow_mut().broken = false;
    assert!(!time.now().is_degraded());
}

#[test]
fn operator_time_overrides_seeded_time() {
    let clock = SimClock::lost_power();
    let mut time = TimeSource::new(Some(clock.clone()), StepTimer::new());
    time.begin().unwrap();

    let at = datetime(2026, 2, 28, 23, 59, 59);
    time.set_time(at).unwrap();
    assert_eq!(time.now(), Timestamp::Calendar(at));
    assert_eq!(clock.0.borrow().adjustments.len(), 2);
}

#[test]
fn temperature_requires_a_clock() {
    let mut with: TimeSource<SimClock, _> =
        TimeSource::new(Some(SimClock::at(datetime(2025, 1, 1, 0, 0, 0))), StepTimer::new());
    assert_eq!(with.temperature(), Ok(25.5));
    let mut without: TimeSource<SimClock, _> = TimeSource::new(None, StepTimer::new());
    assert_eq!(without.temperature(), Err(ClockError::Absent));
}
