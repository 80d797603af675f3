//! DS3231 battery-backed real-time clock over I²C.
//!
//! Time is kept in BCD registers 0x00–0x06 (24-hour mode is always
//! written; 12-hour values left by other firmware are still decoded).
//! The oscillator-stop flag (status bit 7) is the "lost reference"
//! indicator: it is set when backup power failed and cleared by
//! [`adjust`](CalendarClock::adjust).

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::CalendarClock;
use crate::error::ClockError;

/// Fixed 7-bit bus address.
pub const ADDRESS: u8 = 0x68;

mod reg {
    pub const SECONDS: u8 = 0x00;
    pub const STATUS: u8 = 0x0F;
    pub const TEMP_MSB: u8 = 0x11;
}

const STATUS_OSF: u8 = 0x80;
const HOUR_12H: u8 = 0x40;
const HOUR_PM: u8 = 0x20;
const MONTH_CENTURY: u8 = 0x80;

fn bcd_to_bin(v: u8) -> u8 {
    (v >> 4) * 10 + (v & 0x0F)
}

fn bin_to_bcd(v: u8) -> u8 {
    ((v / 10) << 4) | (v % 10)
}

pub struct Ds3231<I> {
    i2c: I,
}

impl<I: I2c> Ds3231<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// `true` if a device acknowledges at [`ADDRESS`].
    pub fn probe(&mut self) -> bool {
        self.read_register(reg::STATUS).is_ok()
    }

    pub fn release(self) -> I {
        self.i2c
    }

    fn read_register(&mut self, register: u8) -> Result<u8, ClockError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(ADDRESS, &[register], &mut buf)
            .map_err(|_| ClockError::Bus)?;
        Ok(buf[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), ClockError> {
        self.i2c
            .write(ADDRESS, &[register, value])
            .map_err(|_| ClockError::Bus)
    }
}

/// Decode the seven time registers.
pub fn decode_time(regs: &[u8; 7]) -> Result<NaiveDateTime, ClockError> {
    let second = bcd_to_bin(regs[0] & 0x7F);
    let minute = bcd_to_bin(regs[1] & 0x7F);
    let hour = if regs[2] & HOUR_12H != 0 {
        let h12 = bcd_to_bin(regs[2] & 0x1F) % 12;
        if regs[2] & HOUR_PM != 0 { h12 + 12 } else { h12 }
    } else {
        bcd_to_bin(regs[2] & 0x3F)
    };
    let day = bcd_to_bin(regs[4] & 0x3F);
    let month = bcd_to_bin(regs[5] & 0x1F);
    let century = if regs[5] & MONTH_CENTURY != 0 { 100 } else { 0 };
    let year = 2000 + century + i32::from(bcd_to_bin(regs[6]));

    NaiveDate::from_ymd_opt(year, month.into(), day.into())
        .and_then(|d| d.and_hms_opt(hour.into(), minute.into(), second.into()))
        .ok_or(ClockError::InvalidTime)
}

/// Encode `at` into the seven time registers.  Years outside 2000..=2199
/// cannot be represented.
pub fn encode_time(at: &NaiveDateTime) -> Result<[u8; 7], ClockError> {
    let offset = at.year() - 2000;
    if !(0..200).contains(&offset) {
        return Err(ClockError::InvalidTime);
    }
    let century = if offset >= 100 { MONTH_CENTURY } else { 0 };
    Ok([
        bin_to_bcd(at.second() as u8),
        bin_to_bcd(at.minute() as u8),
        bin_to_bcd(at.hour() as u8),
        at.weekday().number_from_sunday() as u8,
        bin_to_bcd(at.day() as u8),
        bin_to_bcd(at.month() as u8) | century,
        bin_to_bcd((offset % 100) as u8),
    ])
}

impl<I: I2c> CalendarClock for Ds3231<I> {
    fn now(&mut self) -> Result<NaiveDateTime, ClockError> {
        let mut regs = [0u8; 7];
        self.i2c
            .write_read(ADDRESS, &[reg::SECONDS], &mut regs)
            .map_err(|_| ClockError::Bus)?;
        decode_time(&regs).inspect_err(|_| warn!("rtc: invalid register image {regs:02X?}"))
    }

    fn adjust(&mut self, at: NaiveDateTime) -> Result<(), ClockError> {
        let regs = encode_time(&at)?;
        let mut frame = [0u8; 8];
        frame[0] = reg::SECONDS;
        frame[1..].copy_from_slice(&regs);
        self.i2c.write(ADDRESS, &frame).map_err(|_| ClockError::Bus)?;

        let status = self.read_register(reg::STATUS)?;
        self.write_register(reg::STATUS, status & !STATUS_OSF)
    }

    fn lost_reference(&mut self) -> Result<bool, ClockError> {
        Ok(self.read_register(reg::STATUS)? & STATUS_OSF != 0)
    }

    /// Signed integer part in the MSB, quarter degrees in the top two
    /// bits of the LSB.
    fn temperature(&mut self) -> Result<f32, ClockError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(ADDRESS, &[reg::TEMP_MSB], &mut buf)
            .map_err(|_| ClockError::Bus)?;
        Ok(f32::from(buf[0] as i8) + f32::from(buf[1] >> 6) * 0.25)
    }
}
