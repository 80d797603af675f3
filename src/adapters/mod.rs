//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `log_display`  | DisplayPort        | Serial log output        |
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `time`         | Uptime, DelayNs    | ESP32 system timer       |
//! | `uart`         | Transport          | ESP32 UART (espidf only) |

pub mod log_display;
pub mod log_sink;
pub mod time;
#[cfg(feature = "espidf")]
pub mod uart;
