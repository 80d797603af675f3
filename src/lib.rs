//! FpAccess firmware library.
//!
//! Fingerprint access appliance: an R30x optical sensor gates entry, a
//! SIM800L modem reports each outcome by text message, and a DS3231 RTC
//! timestamps everything.
//!
//! Exposes the pure-logic modules for integration testing. All
//! ESP-IDF-specific code is guarded by `#[cfg(feature = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod biometric;
pub mod config;
pub mod drivers;
pub mod error;
pub mod modem;
pub mod notify;
pub mod pins;
pub mod registry;
pub mod timekeeping;
pub mod transport;

pub use error::{Error, Result};
