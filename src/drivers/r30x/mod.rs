//! R30x / AS608 optical fingerprint sensor driver.
//!
//! Implements [`FingerprintSensor`] over any [`Transport`].  Each call is
//! one command packet followed by one acknowledge packet, whose first
//! payload byte is the confirmation code.  Replies must arrive within a
//! per-instruction deadline or the exchange fails with
//! [`SensorCode::Link`].

pub mod packet;

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{debug, warn};

use crate::app::ports::{
    CharBuffer, FingerprintSensor, SearchHit, SensorCode, SensorParameters, Uptime,
};
use crate::registry::{UserId, MAX_USER_ID};
use crate::transport::Transport;

use packet::{encode_packet, PacketDecoder, PacketKind, DEFAULT_ADDRESS, HEADER_SIZE, MAX_PAYLOAD};

/// Instruction codes.
mod op {
    pub const GEN_IMG: u8 = 0x01;
    pub const IMG_2_TZ: u8 = 0x02;
    pub const SEARCH: u8 = 0x04;
    pub const REG_MODEL: u8 = 0x05;
    pub const STORE: u8 = 0x06;
    pub const DELETE_CHAR: u8 = 0x0C;
    pub const READ_SYS_PARA: u8 = 0x0F;
    pub const VFY_PWD: u8 = 0x13;
    pub const TEMPLATE_NUM: u8 = 0x1D;
    pub const READ_INDEX_TABLE: u8 = 0x1F;
}

/// Reply deadline for ordinary instructions.
const REPLY_TIMEOUT_MS: u32 = 1_000;
/// Library search and flash writes take longer.
const SLOW_REPLY_TIMEOUT_MS: u32 = 3_000;

type Reply = Vec<u8, MAX_PAYLOAD>;

pub struct R30x<T, C> {
    link: T,
    clock: C,
    address: u32,
    password: u32,
    decoder: PacketDecoder,
}

impl<T, C> R30x<T, C>
where
    T: Transport,
    C: Uptime + DelayNs,
{
    pub fn new(link: T, clock: C, password: u32) -> Self {
        Self {
            link,
            clock,
            address: DEFAULT_ADDRESS,
            password,
            decoder: PacketDecoder::new(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.link
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.link
    }

    /// Send one instruction and return the reply payload after the
    /// confirmation byte.
    fn exchange(&mut self, instruction: &[u8], timeout_ms: u32) -> Result<Reply, SensorCode> {
        let mut frame = [0u8; HEADER_SIZE + 16];
        let len = encode_packet(self.address, PacketKind::Command, instruction, &mut frame)
            .ok_or(SensorCode::PacketError)?;

        self.decoder.reset();
        let written = self.link.write_all(&frame[..len]).map_err(|e| {
            warn!("fp: write error {e:?}");
            SensorCode::Link
        })?;
        if written != len {
            return Err(SensorCode::Link);
        }
        self.link.flush().map_err(|_| SensorCode::Link)?;

        let ack = self.await_ack(timeout_ms)?;
        let (&confirmation, rest) = ack.split_first().ok_or(SensorCode::Link)?;
        match SensorCode::from_confirmation(confirmation) {
            None => Ok(Vec::from_slice(rest).unwrap_or_default()),
            Some(code) => {
                debug!("fp: instruction 0x{:02X} -> {code}", instruction[0]);
                Err(code)
            }
        }
    }

    fn await_ack(&mut self, timeout_ms: u32) -> Result<Reply, SensorCode> {
        let start = self.clock.uptime_ms();
        let mut byte = [0u8; 1];
        loop {
            match self.link.read(&mut byte) {
                Ok(1) => {
                    if let Some(p) = self.decoder.push(byte[0]) {
                        if p.kind == PacketKind::Ack {
                            return Ok(p.payload);
                        }
                        debug!("fp: ignoring {:?} packet", p.kind);
                    }
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("fp: read error {e:?}");
                    return Err(SensorCode::Link);
                }
            }
            if self.clock.uptime_ms().saturating_sub(start) >= u64::from(timeout_ms) {
                warn!("fp: no reply within {timeout_ms} ms");
                return Err(SensorCode::Link);
            }
            self.clock.delay_ms(1);
        }
    }
}

fn be16(bytes: &[u8], at: usize) -> Result<u16, SensorCode> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(SensorCode::Link)
}

impl<T, C> FingerprintSensor for R30x<T, C>
where
    T: Transport,
    C: Uptime + DelayNs,
{
    fn verify_password(&mut self) -> Result<(), SensorCode> {
        let [a, b, c, d] = self.password.to_be_bytes();
        self.exchange(&[op::VFY_PWD, a, b, c, d], REPLY_TIMEOUT_MS)
            .map(drop)
    }

    fn capture_image(&mut self) -> Result<(), SensorCode> {
        self.exchange(&[op::GEN_IMG], REPLY_TIMEOUT_MS).map(drop)
    }

    fn convert_image(&mut self, buffer: CharBuffer) -> Result<(), SensorCode> {
        self.exchange(&[op::IMG_2_TZ, buffer as u8], REPLY_TIMEOUT_MS)
            .map(drop)
    }

    fn create_model(&mut self) -> Result<(), SensorCode> {
        self.exchange(&[op::REG_MODEL], REPLY_TIMEOUT_MS).map(drop)
    }

    fn store_model(&mut self, id: UserId) -> Result<(), SensorCode> {
        let [hi, lo] = u16::from(id.get()).to_be_bytes();
        self.exchange(
            &[op::STORE, CharBuffer::One as u8, hi, lo],
            SLOW_REPLY_TIMEOUT_MS,
        )
        .map(drop)
    }

    fn search(&mut self) -> Result<SearchHit, SensorCode> {
        let [start_hi, start_lo] = 1u16.to_be_bytes();
        let [count_hi, count_lo] = u16::from(MAX_USER_ID).to_be_bytes();
        let reply = self.exchange(
            &[op::SEARCH, CharBuffer::One as u8, start_hi, start_lo, count_hi, count_lo],
            SLOW_REPLY_TIMEOUT_MS,
        )?;
        Ok(SearchHit {
            page: be16(&reply, 0)?,
            confidence: be16(&reply, 2)?,
        })
    }

    fn delete_model(&mut self, id: UserId) -> Result<(), SensorCode> {
        let [hi, lo] = u16::from(id.get()).to_be_bytes();
        self.exchange(&[op::DELETE_CHAR, hi, lo, 0x00, 0x01], SLOW_REPLY_TIMEOUT_MS)
            .map(drop)
    }

    /// Page 0 of the index table covers templates 0..=255, one bit each,
    /// least significant bit first.
    fn slot_occupied(&mut self, id: UserId) -> Result<bool, SensorCode> {
        let table = self.exchange(&[op::READ_INDEX_TABLE, 0x00], REPLY_TIMEOUT_MS)?;
        let slot = usize::from(id.get());
        let byte = table.get(slot / 8).ok_or(SensorCode::Link)?;
        Ok(byte & (1 << (slot % 8)) != 0)
    }

    fn template_count(&mut self) -> Result<u16, SensorCode> {
        let reply = self.exchange(&[op::TEMPLATE_NUM], REPLY_TIMEOUT_MS)?;
        be16(&reply, 0)
    }

    fn parameters(&mut self) -> Result<SensorParameters, SensorCode> {
        let r = self.exchange(&[op::READ_SYS_PARA], REPLY_TIMEOUT_MS)?;
        let address = r.get(8..12).ok_or(SensorCode::Link)?;
        Ok(SensorParameters {
            status: be16(&r, 0)?,
            system_id: be16(&r, 2)?,
            capacity: be16(&r, 4)?,
            security_level: be16(&r, 6)?,
            device_address: u32::from_be_bytes([address[0], address[1], address[2], address[3]]),
            packet_len: 32u16 << be16(&r, 12)?.min(3),
            baud_multiplier: be16(&r, 14)?,
        })
    }
}
