//! ESP32 time adapter.
//!
//! Provides monotonic time and blocking delays for the FpAccess firmware.
//!
//! - **`feature = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer; millisecond delays yield to FreeRTOS,
//!   shorter ones busy-wait in ROM.
//! - **otherwise**: uses `std::time::Instant` and `std::thread::sleep`
//!   for host-side simulation.

use embedded_hal::delay::DelayNs;

use crate::app::ports::Uptime;

/// Monotonic timer.  Cheap to clone; every clone reads the same clock.
#[derive(Clone)]
pub struct SystemTimer {
    #[cfg(not(feature = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemTimer {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(feature = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since construction (monotonic).
    #[cfg(not(feature = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Uptime for SystemTimer {
    fn uptime_ms(&self) -> u64 {
        self.uptime_us() / 1_000
    }
}

impl DelayNs for SystemTimer {
    #[cfg(feature = "espidf")]
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_hal::delay::Ets::delay_us(ns.div_ceil(1_000));
    }

    #[cfg(not(feature = "espidf"))]
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(u64::from(ns)));
    }

    #[cfg(feature = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }
}
