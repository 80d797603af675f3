//! UART transport adapter (ESP-IDF only).
//!
//! Wraps an `esp_idf_hal` UART driver as a non-blocking [`Transport`]:
//! `read` returns whatever is already in the RX FIFO and never waits.

use esp_idf_hal::delay::{BLOCK, NON_BLOCK};
use esp_idf_hal::sys::EspError;
use esp_idf_hal::uart::UartDriver;

use crate::transport::Transport;

pub struct UartTransport {
    uart: UartDriver<'static>,
}

impl UartTransport {
    pub fn new(uart: UartDriver<'static>) -> Self {
        Self { uart }
    }
}

impl Transport for UartTransport {
    type Error = EspError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
        self.uart.read(buf, NON_BLOCK)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, EspError> {
        self.uart.write(data)
    }

    fn flush(&mut self) -> Result<(), EspError> {
        self.uart.wait_tx_done(BLOCK)
    }
}
