//! GPIO / peripheral pin assignments for the FpAccess board (ESP32).
//!
//! Every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Fingerprint sensor (R307 / AS608) on UART2
// ---------------------------------------------------------------------------

/// ESP32 RX ← sensor TX.
pub const FP_UART_RX_GPIO: i32 = 16;
/// ESP32 TX → sensor RX.
pub const FP_UART_TX_GPIO: i32 = 17;

// ---------------------------------------------------------------------------
// SIM800L modem on UART1
// ---------------------------------------------------------------------------

/// ESP32 RX ← modem TX.
pub const GSM_UART_RX_GPIO: i32 = 26;
/// ESP32 TX → modem RX.
pub const GSM_UART_TX_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// I²C bus (DS3231 RTC)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
/// Standard-mode bus clock.
pub const I2C_FREQ_HZ: u32 = 100_000;
