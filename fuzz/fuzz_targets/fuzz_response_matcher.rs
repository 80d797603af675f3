//! Fuzz target: modem response scanning
//!
//! Arbitrary bytes stand in for whatever the modem (or line noise) puts
//! on the wire.  Token search and `+CSQ` parsing must never panic, and a
//! parsed signal level is always in range.
//!
//! cargo fuzz run fuzz_response_matcher

#![no_main]

use fpaccess::modem::{contains_token, parse_signal_quality};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for token in ["OK", "+CSQ", ">", "ERROR", ""] {
        let _ = contains_token(data, token);
    }
    assert!(contains_token(data, ""));

    if let Ok(text) = core::str::from_utf8(data) {
        if let Some(rssi) = parse_signal_quality(text) {
            assert!(rssi <= 31, "rssi out of range");
        }
    }
});
