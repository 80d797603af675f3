//! Peripheral drivers: fingerprint sensor, RTC and watchdog.

pub mod ds3231;
pub mod r30x;
pub mod watchdog;
