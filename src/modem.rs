//! SIM800L modem driver — AT command/response over a byte stream.
//!
//! Every exchange follows the same shape:
//!
//! ```text
//!  discard pending ─▶ write command line ─▶ drain bytes ─▶ token in buffer?
//!                                          ▲                │ no
//!                                          └── before deadline
//! ```
//!
//! Bytes already waiting on the link when an exchange starts belong to an
//! earlier one and are thrown away.  Success is the expected token
//! appearing *anywhere* in the bytes accumulated since the command was
//! written.  There is no line parser:
//! an unsolicited result code that happens to contain the token satisfies
//! the wait just as well as the real reply.
//!
//! The driver takes `&mut self` for every exchange, so only one command
//! can ever be in flight on the link.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{debug, info, warn};

use crate::app::ports::{MessageSender, Uptime};
use crate::config::SystemConfig;
use crate::error::TransportError;
use crate::transport::Transport;

/// Bytes kept from the most recent exchange.  Older bytes are dropped
/// first once it fills.
pub const RESPONSE_CAPACITY: usize = 1024;

/// End-of-message marker for `AT+CMGS` (Ctrl-Z).
pub const CTRL_Z: u8 = 26;

/// Idle pause between drains while waiting for a token.
const POLL_INTERVAL_MS: u32 = 5;

/// Does `token` occur anywhere in `haystack`?  An empty token always
/// matches.
pub fn contains_token(haystack: &[u8], token: &str) -> bool {
    let needle = token.as_bytes();
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Signal strength (0–31) from a `+CSQ: <rssi>,<ber>` report.  `99`
/// ("not detectable") and malformed reports yield `None`.
pub fn parse_signal_quality(response: &str) -> Option<u8> {
    let (_, rest) = response.split_once("+CSQ:")?;
    let rssi: u8 = rest.trim_start().split(',').next()?.trim().parse().ok()?;
    (rssi <= 31).then_some(rssi)
}

/// Modem timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemTiming {
    pub command_timeout_ms: u32,
    pub message_timeout_ms: u32,
    pub address_settle_ms: u32,
    pub payload_settle_ms: u32,
    pub dial_settle_ms: u32,
    pub signal_query_ms: u32,
}

impl From<&SystemConfig> for ModemTiming {
    fn from(c: &SystemConfig) -> Self {
        Self {
            command_timeout_ms: c.command_timeout_ms,
            message_timeout_ms: c.message_timeout_ms,
            address_settle_ms: c.address_settle_ms,
            payload_settle_ms: c.payload_settle_ms,
            dial_settle_ms: c.dial_settle_ms,
            signal_query_ms: c.signal_query_ms,
        }
    }
}

pub struct Modem<T, C> {
    link: T,
    clock: C,
    timing: ModemTiming,
    ready: bool,
    signal: Option<u8>,
    response: Vec<u8, RESPONSE_CAPACITY>,
}

impl<T, C> Modem<T, C>
where
    T: Transport,
    C: Uptime + DelayNs,
{
    pub fn new(link: T, clock: C, timing: ModemTiming) -> Self {
        Self {
            link,
            clock,
            timing,
            ready: false,
            signal: None,
            response: Vec::new(),
        }
    }

    /// Startup handshake.  Readiness is granted only once text mode is
    /// acknowledged; the signal query and the new-message routing are
    /// best-effort.
    pub fn begin(&mut self) -> Result<(), TransportError> {
        self.ready = false;
        let t = self.timing;

        if self.send_command("AT", "OK", t.command_timeout_ms).is_err() {
            warn!("gsm: no response to AT");
            return Err(TransportError::NotReady);
        }

        // The echoed command line already contains "+CSQ", so wait for the
        // final result code and pick the report out of the buffer.
        match self.send_command("AT+CSQ", "OK", t.signal_query_ms) {
            Ok(()) => {
                self.signal = parse_signal_quality(self.last_response());
                info!("gsm: signal {}", self.last_response().trim());
            }
            Err(_) => warn!("gsm: no signal report"),
        }

        if self.send_command("AT+CMGF=1", "OK", t.command_timeout_ms).is_err() {
            warn!("gsm: text mode not acknowledged, messaging disabled");
            return Err(TransportError::NotReady);
        }
        self.ready = true;

        if self
            .send_command("AT+CNMI=2,2,0,0,0", "OK", t.command_timeout_ms)
            .is_err()
        {
            debug!("gsm: CNMI not acknowledged");
        }

        info!("gsm: modem ready");
        Ok(())
    }

    /// Write `command` followed by CRLF, then wait up to `timeout_ms` for
    /// `token` to appear in the accumulated response.
    ///
    /// This is the raw exchange used by the handshake and does not consult
    /// the readiness gate.  On failure the bytes received so far stay
    /// available through [`last_response`](Self::last_response).
    pub fn send_command(
        &mut self,
        command: &str,
        token: &str,
        timeout_ms: u32,
    ) -> Result<(), TransportError> {
        self.discard_pending();
        debug!("gsm: > {command}");
        self.write_raw(command.as_bytes())?;
        self.write_raw(b"\r\n")?;
        self.await_token(token, timeout_ms)
    }

    /// Submit one text message.  Addressing frame, settle, payload, settle,
    /// Ctrl-Z, then a long wait for `OK`.  Never retried here.
    pub fn send_message(&mut self, destination: &str, body: &str) -> Result<(), TransportError> {
        if !self.ready {
            return Err(TransportError::NotReady);
        }
        let t = self.timing;
        self.discard_pending();

        info!("gsm: sending message to {destination}");
        self.write_raw(b"AT+CMGS=\"")?;
        self.write_raw(destination.as_bytes())?;
        self.write_raw(b"\"\r\n")?;
        self.clock.delay_ms(t.address_settle_ms);
        self.drain();

        self.write_raw(body.as_bytes())?;
        self.clock.delay_ms(t.payload_settle_ms);
        self.write_raw(&[CTRL_Z])?;

        match self.await_token("OK", t.message_timeout_ms) {
            Ok(()) => {
                info!("gsm: message sent");
                Ok(())
            }
            Err(e) => {
                warn!("gsm: message to {destination} failed ({e})");
                Err(e)
            }
        }
    }

    /// Dial `destination` and return after a short settle.  Call progress
    /// is not tracked.
    pub fn place_call(&mut self, destination: &str) -> Result<(), TransportError> {
        if !self.ready {
            return Err(TransportError::NotReady);
        }
        self.discard_pending();
        info!("gsm: calling {destination}");
        self.write_raw(b"ATD")?;
        self.write_raw(destination.as_bytes())?;
        self.write_raw(b";\r\n")?;
        self.clock.delay_ms(self.timing.dial_settle_ms);
        self.drain();
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Signal strength from the last handshake, if the modem reported one.
    pub fn signal_quality(&self) -> Option<u8> {
        self.signal
    }

    /// Bytes accumulated by the most recent exchange, up to the first
    /// invalid UTF-8 sequence.
    pub fn last_response(&self) -> &str {
        match core::str::from_utf8(&self.response) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&self.response[..e.valid_up_to()]).unwrap_or_default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.link
    }

    // ── Internal ──────────────────────────────────────────────

    fn await_token(&mut self, token: &str, timeout_ms: u32) -> Result<(), TransportError> {
        let start = self.clock.uptime_ms();
        loop {
            self.drain();
            if contains_token(&self.response, token) {
                return Ok(());
            }
            if self.clock.uptime_ms().saturating_sub(start) >= u64::from(timeout_ms) {
                debug!("gsm: timed out waiting for {token:?}");
                return Err(TransportError::Timeout);
            }
            self.clock.delay_ms(POLL_INTERVAL_MS);
        }
    }

    /// Drop late replies and unsolicited codes left over from earlier
    /// exchanges, then start an empty response.
    fn discard_pending(&mut self) {
        self.drain();
        if !self.response.is_empty() {
            debug!("gsm: discarding {} stale bytes", self.response.len());
        }
        self.response.clear();
    }

    /// Move every pending byte into the response buffer.
    fn drain(&mut self) {
        let mut chunk = [0u8; 64];
        loop {
            let n = match self.link.read(&mut chunk) {
                Ok(0) => return,
                Ok(n) => n,
                Err(e) => {
                    warn!("gsm: read error {e:?}");
                    return;
                }
            };
            for &byte in &chunk[..n] {
                if self.response.is_full() {
                    self.response.remove(0);
                }
                // Cannot fail: a slot was just freed.
                let _ = self.response.push(byte);
            }
        }
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let written = self.link.write_all(bytes).map_err(|e| {
            warn!("gsm: write error {e:?}");
            TransportError::Write
        })?;
        if written != bytes.len() {
            warn!("gsm: short write ({written}/{})", bytes.len());
            return Err(TransportError::Write);
        }
        self.link.flush().map_err(|_| TransportError::Write)
    }
}

impl<T, C> MessageSender for Modem<T, C>
where
    T: Transport,
    C: Uptime + DelayNs,
{
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn send_message(&mut self, destination: &str, body: &str) -> Result<(), TransportError> {
        Modem::send_message(self, destination, body)
    }

    fn place_call(&mut self, destination: &str) -> Result<(), TransportError> {
        Modem::place_call(self, destination)
    }
}
