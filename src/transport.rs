//! Transport abstraction — any byte-oriented serial channel.
//!
//! Concrete implementations:
//! - ESP32 UART (fingerprint sensor on UART2, SIM800L modem on UART1)
//! - Scripted in-memory streams in host tests
//!
//! Both the modem driver and the R30x sensor driver are generic over
//! `Transport`, so neither knows which UART (or mock) it is talking to.

/// Byte-oriented transport channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns the number of bytes actually read.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Write all of `data`, retrying short writes.  Stops early if the
    /// channel accepts nothing; returns the number of bytes written.
    fn write_all(&mut self, mut data: &[u8]) -> Result<usize, Self::Error> {
        let mut total = 0;
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                break;
            }
            total += n;
            data = &data[n..];
        }
        Ok(total)
    }
}
