//! R30x / AS608 packet codec.
//!
//! Wire format (all multi-byte fields big-endian):
//! ```text
//! ┌────────┬──────────┬──────┬────────┬──────────────┬──────────┐
//! │ 0xEF01 │ address  │ type │ length │ payload      │ checksum │
//! │ 2B     │ 4B       │ 1B   │ 2B     │ length - 2 B │ 2B       │
//! └────────┴──────────┴──────┴────────┴──────────────┴──────────┘
//! ```
//!
//! `length` counts the payload plus the checksum.  The checksum is the
//! 16-bit wrapping sum of the type byte, both length bytes and every
//! payload byte.
//!
//! The decoder is fed one byte at a time, so a packet may arrive split
//! across any number of reads.  Garbage before the start code and packets
//! that fail validation are skipped.

use heapless::Vec;

pub const START_CODE: [u8; 2] = [0xEF, 0x01];

/// Address every factory-fresh sensor answers to.
pub const DEFAULT_ADDRESS: u32 = 0xFFFF_FFFF;

/// Largest payload the sensor ever sends (256-byte data packets).
pub const MAX_PAYLOAD: usize = 256;

/// Start code + address + type + length.
pub const HEADER_SIZE: usize = 9;

/// Address + type + length (the part after the start code).
const PREAMBLE_SIZE: usize = HEADER_SIZE - START_CODE.len();

const CHECKSUM_SIZE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    Command = 0x01,
    Data = 0x02,
    Ack = 0x07,
    EndData = 0x08,
}

impl PacketKind {
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0x01 => Some(Self::Command),
            0x02 => Some(Self::Data),
            0x07 => Some(Self::Ack),
            0x08 => Some(Self::EndData),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub address: u32,
    pub kind: PacketKind,
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

/// Checksum over type, length field and payload.
pub fn checksum(kind: PacketKind, length: u16, payload: &[u8]) -> u16 {
    let [hi, lo] = length.to_be_bytes();
    payload
        .iter()
        .chain([kind as u8, hi, lo].iter())
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Encode one packet into `out`.  Returns the number of bytes written, or
/// `None` if the payload is too large or `out` too small.
pub fn encode_packet(address: u32, kind: PacketKind, payload: &[u8], out: &mut [u8]) -> Option<usize> {
    if payload.len() > MAX_PAYLOAD {
        return None;
    }
    let total = HEADER_SIZE + payload.len() + CHECKSUM_SIZE;
    if out.len() < total {
        return None;
    }
    let length = (payload.len() + CHECKSUM_SIZE) as u16;

    out[..2].copy_from_slice(&START_CODE);
    out[2..6].copy_from_slice(&address.to_be_bytes());
    out[6] = kind as u8;
    out[7..9].copy_from_slice(&length.to_be_bytes());
    out[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);
    out[total - 2..total].copy_from_slice(&checksum(kind, length, payload).to_be_bytes());
    Some(total)
}

// ---------------------------------------------------------------------------
// Streaming decoder
// ---------------------------------------------------------------------------

enum DecoderState {
    /// Hunting for the start code; `matched` bytes of it seen so far.
    Sync { matched: usize },
    /// Start code seen, collecting address, type and length.
    Preamble { collected: usize },
    /// Collecting payload and checksum.
    Body { expected: usize, collected: usize },
}

pub struct PacketDecoder {
    state: DecoderState,
    preamble: [u8; PREAMBLE_SIZE],
    body: [u8; MAX_PAYLOAD + CHECKSUM_SIZE],
    rejected: u32,
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Sync { matched: 0 },
            preamble: [0; PREAMBLE_SIZE],
            body: [0; MAX_PAYLOAD + CHECKSUM_SIZE],
            rejected: 0,
        }
    }

    /// Feed one byte.  Returns a packet once its last byte arrives and it
    /// passed validation.
    pub fn push(&mut self, byte: u8) -> Option<Packet> {
        match &mut self.state {
            DecoderState::Sync { matched } => {
                match (*matched, byte) {
                    (1, b) if b == START_CODE[1] => {
                        self.state = DecoderState::Preamble { collected: 0 };
                    }
                    (_, b) if b == START_CODE[0] => *matched = 1,
                    _ => *matched = 0,
                }
                None
            }

            DecoderState::Preamble { collected } => {
                self.preamble[*collected] = byte;
                *collected += 1;
                if *collected == PREAMBLE_SIZE {
                    let length = usize::from(u16::from_be_bytes([self.preamble[5], self.preamble[6]]));
                    let kind_ok = PacketKind::from_u8(self.preamble[4]).is_some();
                    if !kind_ok || !(CHECKSUM_SIZE..=MAX_PAYLOAD + CHECKSUM_SIZE).contains(&length) {
                        self.reject();
                    } else {
                        self.state = DecoderState::Body {
                            expected: length,
                            collected: 0,
                        };
                    }
                }
                None
            }

            DecoderState::Body { expected, collected } => {
                self.body[*collected] = byte;
                *collected += 1;
                if *collected < *expected {
                    return None;
                }
                let length = *expected;
                self.state = DecoderState::Sync { matched: 0 };
                self.finish(length)
            }
        }
    }

    /// Feed a slice; returns the first complete packet and how many bytes
    /// were consumed to reach it.
    pub fn feed(&mut self, data: &[u8]) -> (usize, Option<Packet>) {
        for (i, &b) in data.iter().enumerate() {
            if let Some(p) = self.push(b) {
                return (i + 1, Some(p));
            }
        }
        (data.len(), None)
    }

    /// Packets dropped for a bad type, length or checksum.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    pub fn reset(&mut self) {
        self.state = DecoderState::Sync { matched: 0 };
    }

    fn finish(&mut self, length: usize) -> Option<Packet> {
        let address = u32::from_be_bytes([
            self.preamble[0],
            self.preamble[1],
            self.preamble[2],
            self.preamble[3],
        ]);
        let kind = PacketKind::from_u8(self.preamble[4])?;
        let payload_len = length - CHECKSUM_SIZE;
        let payload = &self.body[..payload_len];
        let received = u16::from_be_bytes([self.body[payload_len], self.body[payload_len + 1]]);
        if received != checksum(kind, length as u16, payload) {
            self.rejected += 1;
            return None;
        }
        Some(Packet {
            address,
            kind,
            payload: Vec::from_slice(payload).ok()?,
        })
    }

    fn reject(&mut self) {
        self.rejected += 1;
        self.state = DecoderState::Sync { matched: 0 };
    }
}
