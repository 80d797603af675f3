//! Mock hardware adapters for integration tests.
//!
//! Every mock is a cheap handle over shared state (`Rc<RefCell<_>>`), so a
//! test can hand one clone to the appliance and keep another to script
//! inputs and inspect what happened.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};
use embedded_hal::delay::DelayNs;

use fpaccess::app::events::AppEvent;
use fpaccess::app::ports::{
    CalendarClock, CharBuffer, DisplayPort, EventSink, FingerprintSensor, MessageSender,
    SearchHit, SensorCode, SensorParameters, Uptime,
};
use fpaccess::error::{ClockError, TransportError};
use fpaccess::modem::CTRL_Z;
use fpaccess::registry::UserId;
use fpaccess::transport::Transport;

// ── Fingerprint sensor ────────────────────────────────────────

/// A "finger" is just a number; two samples match when they are equal.
pub type Finger = u32;

#[derive(Default)]
pub struct SensorState {
    /// One entry per capture poll.  `None` (or an empty queue) is an
    /// empty glass.
    pub frames: VecDeque<Option<Finger>>,
    pub image: Option<Finger>,
    pub buffers: [Option<Finger>; 2],
    pub model: Option<Finger>,
    pub library: BTreeMap<u8, Finger>,
    /// Sensor does not answer at all.
    pub absent: bool,
    /// Returned by every capture instead of imaging.
    pub capture_fault: Option<SensorCode>,
    pub store_fault: Option<SensorCode>,
    pub searches: usize,
    pub stores: usize,
}

#[derive(Clone, Default)]
pub struct SimSensor(pub Rc<RefCell<SensorState>>);

impl SimSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue polls: `Some(f)` is finger `f` on the glass, `None` is empty.
    pub fn script(&self, frames: &[Option<Finger>]) {
        self.0.borrow_mut().frames.extend(frames.iter().copied());
    }

    /// Queue a clean enrollment of `finger`: place, lift, place again.
    pub fn script_enrollment(&self, finger: Finger) {
        self.script(&[Some(finger), None, Some(finger)]);
    }

    pub fn with_template(self, id: u8, finger: Finger) -> Self {
        self.0.borrow_mut().library.insert(id, finger);
        self
    }

    pub fn library(&self) -> BTreeMap<u8, Finger> {
        self.0.borrow().library.clone()
    }

    pub fn searches(&self) -> usize {
        self.0.borrow().searches
    }

    fn gate(&self) -> Result<(), SensorCode> {
        if self.0.borrow().absent {
            Err(SensorCode::Link)
        } else {
            Ok(())
        }
    }
}

impl FingerprintSensor for SimSensor {
    fn verify_password(&mut self) -> Result<(), SensorCode> {
        self.gate()
    }

    fn capture_image(&mut self) -> Result<(), SensorCode> {
        self.gate()?;
        let mut s = self.0.borrow_mut();
        if let Some(code) = s.capture_fault {
            return Err(code);
        }
        match s.frames.pop_front().flatten() {
            Some(f) => {
                s.image = Some(f);
                Ok(())
            }
            None => Err(SensorCode::NoFinger),
        }
    }

    fn convert_image(&mut self, buffer: CharBuffer) -> Result<(), SensorCode> {
        self.gate()?;
        let mut s = self.0.borrow_mut();
        let image = s.image.ok_or(SensorCode::InvalidImage)?;
        s.buffers[buffer as usize - 1] = Some(image);
        Ok(())
    }

    fn create_model(&mut self) -> Result<(), SensorCode> {
        self.gate()?;
        let mut s = self.0.borrow_mut();
        match s.buffers {
            [Some(a), Some(b)] if a == b => {
                s.model = Some(a);
                Ok(())
            }
            _ => Err(SensorCode::EnrollMismatch),
        }
    }

    fn store_model(&mut self, id: UserId) -> Result<(), SensorCode> {
        self.gate()?;
        let mut s = self.0.borrow_mut();
        if let Some(code) = s.store_fault {
            return Err(code);
        }
        let model = s.model.ok_or(SensorCode::FlashError)?;
        s.library.insert(id.get(), model);
        s.stores += 1;
        Ok(())
    }

    fn search(&mut self) -> Result<SearchHit, SensorCode> {
        self.gate()?;
        let mut s = self.0.borrow_mut();
        s.searches += 1;
        let sample = s.buffers[0].ok_or(SensorCode::InvalidImage)?;
        s.library
            .iter()
            .find(|(_, f)| **f == sample)
            .map(|(page, _)| SearchHit {
                page: u16::from(*page),
                confidence: 87,
            })
            .ok_or(SensorCode::NotFound)
    }

    fn delete_model(&mut self, id: UserId) -> Result<(), SensorCode> {
        self.gate()?;
        self.0
            .borrow_mut()
            .library
            .remove(&id.get())
            .map(drop)
            .ok_or(SensorCode::DeleteFail)
    }

    fn slot_occupied(&mut self, id: UserId) -> Result<bool, SensorCode> {
        self.gate()?;
        Ok(self.0.borrow().library.contains_key(&id.get()))
    }

    fn template_count(&mut self) -> Result<u16, SensorCode> {
        self.gate()?;
        Ok(self.0.borrow().library.len() as u16)
    }

    fn parameters(&mut self) -> Result<SensorParameters, SensorCode> {
        self.gate()?;
        Ok(SensorParameters {
            capacity: 127,
            security_level: 3,
            device_address: 0xFFFF_FFFF,
            packet_len: 128,
            baud_multiplier: 6,
            ..SensorParameters::default()
        })
    }
}

// ── Modem byte stream ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sms {
    pub to: String,
    pub body: String,
}

#[derive(Default)]
pub struct ModemState {
    /// Modem never answers anything.
    pub silent: bool,
    /// `AT+CMGF=1` is answered with ERROR.
    pub reject_text_mode: bool,
    /// Message submissions end in ERROR.
    pub fail_sends: bool,
    /// Every written byte is reflected back at once, as with ATE1.
    pub echo: bool,
    /// Replies become readable only this long after the command, measured
    /// on the shared timer.
    pub lag: Option<(StepTimer, u64)>,
    /// Replies waiting for their lag to elapse, with their due time.
    delayed: VecDeque<(u64, Vec<u8>)>,
    /// Text that shows up right after the next command line, even from a
    /// silent modem.
    interjection: Option<String>,
    pub written: Vec<u8>,
    pub commands: Vec<String>,
    pub sent: Vec<Sms>,
    pub calls: Vec<String>,
    /// Bytes queued for the driver to read.
    pub inbound: VecDeque<u8>,
    line: Vec<u8>,
    /// Destination of an `AT+CMGS` awaiting its payload.
    composing: Option<String>,
}

impl ModemState {
    fn reply(&mut self, text: &str) {
        if self.silent {
            return;
        }
        match &self.lag {
            Some((timer, ms)) => {
                let due = timer.now_ms() + ms;
                self.delayed.push_back((due, text.as_bytes().to_vec()));
            }
            None => self.inbound.extend(text.bytes()),
        }
    }

    fn release_due(&mut self) {
        let Some((timer, _)) = &self.lag else { return };
        let now = timer.now_ms();
        while self.delayed.front().is_some_and(|(due, _)| *due <= now) {
            if let Some((_, bytes)) = self.delayed.pop_front() {
                self.inbound.extend(bytes);
            }
        }
    }

    fn on_byte(&mut self, byte: u8) {
        if self.echo && !self.silent {
            self.inbound.push_back(byte);
        }
        if let Some(to) = self.composing.clone() {
            if byte == CTRL_Z {
                let body = String::from_utf8_lossy(&self.line).into_owned();
                self.line.clear();
                self.composing = None;
                if self.silent {
                    return;
                }
                if self.fail_sends {
                    self.reply("\r\nERROR\r\n");
                } else {
                    self.sent.push(Sms { to, body });
                    self.reply("\r\n+CMGS: 12\r\n\r\nOK\r\n");
                }
            } else {
                self.line.push(byte);
            }
            return;
        }

        if byte != b'\n' {
            self.line.push(byte);
            return;
        }
        let line = String::from_utf8_lossy(&self.line)
            .trim_end_matches('\r')
            .to_string();
        self.line.clear();
        self.commands.push(line.clone());
        if let Some(text) = self.interjection.take() {
            self.inbound.extend(text.bytes());
        }

        if let Some(rest) = line.strip_prefix("AT+CMGS=\"") {
            self.composing = Some(rest.trim_end_matches('"').to_string());
            self.reply("\r\n> ");
        } else if let Some(rest) = line.strip_prefix("ATD") {
            self.calls.push(rest.trim_end_matches(';').to_string());
            self.reply("\r\nOK\r\n");
        } else if line == "AT+CSQ" {
            self.reply("\r\n+CSQ: 18,0\r\n\r\nOK\r\n");
        } else if line == "AT+CMGF=1" && self.reject_text_mode {
            self.reply("\r\nERROR\r\n");
        } else if line.starts_with("AT") {
            self.reply("\r\nOK\r\n");
        } else {
            self.reply("\r\nERROR\r\n");
        }
    }
}

/// SIM800L stand-in that understands just enough AT to drive the
/// handshake, `AT+CMGS` and `ATD`.
#[derive(Clone, Default)]
pub struct ScriptedModem(pub Rc<RefCell<ModemState>>);

impl ScriptedModem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn silent() -> Self {
        let m = Self::default();
        m.0.borrow_mut().silent = true;
        m
    }

    pub fn sent(&self) -> Vec<Sms> {
        self.0.borrow().sent.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.borrow().calls.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.0.borrow().commands.clone()
    }

    /// Echoes commands and answers each one `reply_ms` later on `timer`,
    /// like a SIM800L fresh out of reset.
    pub fn echoing(timer: &StepTimer, reply_ms: u64) -> Self {
        let m = Self::default();
        {
            let mut s = m.0.borrow_mut();
            s.echo = true;
            s.lag = Some((timer.clone(), reply_ms));
        }
        m
    }

    /// Inject an unsolicited line, as the modem would on an incoming SMS.
    pub fn unsolicited(&self, text: &str) {
        self.0.borrow_mut().inbound.extend(text.bytes());
    }

    /// Inject an unsolicited line once the next command has been written.
    pub fn unsolicited_after_next_command(&self, text: &str) {
        self.0.borrow_mut().interjection = Some(text.into());
    }
}

impl Transport for ScriptedModem {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let mut s = self.0.borrow_mut();
        s.release_due();
        let n = buf.len().min(s.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(s.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        let mut s = self.0.borrow_mut();
        s.written.extend_from_slice(data);
        for &b in data {
            s.on_byte(b);
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

// ── Messaging without a byte stream ───────────────────────────

/// Records messages handed to the [`MessageSender`] port.
#[derive(Default)]
pub struct RecordingSender {
    pub ready: bool,
    pub fail: bool,
    pub sent: Vec<Sms>,
    pub calls: Vec<String>,
}

impl RecordingSender {
    pub fn ready() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }
}

impl MessageSender for RecordingSender {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn send_message(&mut self, destination: &str, body: &str) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Timeout);
        }
        self.sent.push(Sms {
            to: destination.into(),
            body: body.into(),
        });
        Ok(())
    }

    fn place_call(&mut self, destination: &str) -> Result<(), TransportError> {
        self.calls.push(destination.into());
        Ok(())
    }
}

// ── Time ──────────────────────────────────────────────────────

/// Monotonic clock that only moves when someone delays.
#[derive(Clone, Default)]
pub struct StepTimer(pub Rc<Cell<u64>>);

impl StepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.0.get()
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Uptime for StepTimer {
    fn uptime_ms(&self) -> u64 {
        self.0.get()
    }
}

impl DelayNs for StepTimer {
    fn delay_ns(&mut self, ns: u32) {
        // Sub-millisecond delays still move time so poll loops end.
        self.advance(u64::from(ns / 1_000_000).max(1));
    }
}

pub struct ClockState {
    pub now: NaiveDateTime,
    pub lost: bool,
    pub broken: bool,
    pub adjustments: Vec<NaiveDateTime>,
}

/// DS3231 stand-in.
#[derive(Clone)]
pub struct SimClock(pub Rc<RefCell<ClockState>>);

impl SimClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self(Rc::new(RefCell::new(ClockState {
            now,
            lost: false,
            broken: false,
            adjustments: Vec::new(),
        })))
    }

    /// A clock whose backup battery was removed.
    pub fn lost_power() -> Self {
        let c = Self::at(datetime(2000, 1, 1, 0, 0, 0));
        c.0.borrow_mut().lost = true;
        c
    }

    pub fn now(&self) -> NaiveDateTime {
        self.0.borrow().now
    }
}

impl CalendarClock for SimClock {
    fn now(&mut self) -> Result<NaiveDateTime, ClockError> {
        let s = self.0.borrow();
        if s.broken {
            return Err(ClockError::Bus);
        }
        Ok(s.now)
    }

    fn adjust(&mut self, at: NaiveDateTime) -> Result<(), ClockError> {
        let mut s = self.0.borrow_mut();
        s.now = at;
        s.lost = false;
        s.adjustments.push(at);
        Ok(())
    }

    fn lost_reference(&mut self) -> Result<bool, ClockError> {
        Ok(self.0.borrow().lost)
    }

    fn temperature(&mut self) -> Result<f32, ClockError> {
        Ok(25.5)
    }
}

pub fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .and_then(|date| date.and_hms_opt(h, mi, s))
        .expect("valid test date")
}

// ── Display & event sink ──────────────────────────────────────

#[derive(Default)]
pub struct RecordingDisplay {
    pub screens: Vec<Vec<String>>,
    pub backlight: Option<bool>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Vec<String> {
        self.screens.last().cloned().unwrap_or_default()
    }

    pub fn showed(&self, text: &str) -> bool {
        self.screens.iter().flatten().any(|l| l == text)
    }
}

impl DisplayPort for RecordingDisplay {
    fn show(&mut self, lines: &[&str]) {
        self.screens
            .push(lines.iter().take(4).map(|l| l.to_string()).collect());
    }

    fn set_backlight(&mut self, on: bool) {
        self.backlight = Some(on);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
