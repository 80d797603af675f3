//! Application core — domain orchestration, zero direct I/O.
//!
//! This module contains the appliance's business rules: when to scan,
//! what an access outcome means, who gets told. All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
