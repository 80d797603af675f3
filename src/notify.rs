//! Notification dispatcher — turns access outcomes into text messages.
//!
//! | Event             | Admin message | User message                      |
//! |-------------------|---------------|-----------------------------------|
//! | granted, known    | name, id, time| if `notify_on_access` and a phone |
//! | granted, dangling | id, time      | never                             |
//! | denied            | time          | never                             |
//! | enrolled          | name, id, time| never                             |
//!
//! "Dangling" means the sensor matched an id the registry has no record
//! for; the two stores are updated independently and may diverge.

use core::fmt::{self, Write as _};

use heapless::String;
use log::{info, warn};

use crate::app::ports::{CalendarClock, MessageSender, Uptime};
use crate::error::{NotifyError, TransportError};
use crate::registry::{truncated, UserId, UserRegistry, PHONE_LEN};
use crate::timekeeping::{TimeSource, Timestamp};

/// Longest message body composed here (one SMS).
pub const MESSAGE_LEN: usize = 160;

pub type MessageText = String<MESSAGE_LEN>;

/// One access attempt, consumed once by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessEvent {
    /// Matched id, `None` for an unrecognised finger.
    pub id: Option<UserId>,
    pub granted: bool,
    pub timestamp: Timestamp,
}

impl AccessEvent {
    pub fn granted(id: UserId, timestamp: Timestamp) -> Self {
        Self {
            id: Some(id),
            granted: true,
            timestamp,
        }
    }

    pub fn denied(timestamp: Timestamp) -> Self {
        Self {
            id: None,
            granted: false,
            timestamp,
        }
    }
}

/// Outcome of a batch of sends triggered by one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempted: u8,
    pub sent: u8,
    /// Last transport failure, if any send failed.
    pub last_error: Option<TransportError>,
}

impl DeliveryReport {
    pub fn all_sent(&self) -> bool {
        self.sent == self.attempted
    }

    fn record(&mut self, outcome: Result<(), TransportError>) {
        self.attempted += 1;
        match outcome {
            Ok(()) => self.sent += 1,
            Err(e) => self.last_error = Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Message composition
// ---------------------------------------------------------------------------

/// Format into a bounded message.  Text past [`MESSAGE_LEN`] is dropped.
fn compose(args: fmt::Arguments<'_>) -> MessageText {
    let mut out = MessageText::new();
    if out.write_fmt(args).is_err() {
        warn!("notify: message truncated");
    }
    out
}

pub fn granted_message(name: Option<&str>, id: UserId, at: Timestamp) -> MessageText {
    match name {
        Some(name) => compose(format_args!(
            "ACCESS GRANTED\nUser: {name}\nID: {id}\nTime: {at}"
        )),
        None => compose(format_args!("ACCESS GRANTED\nID: {id}\nTime: {at}")),
    }
}

/// Greeting sent to the user.  Uses the time of day when the clock is
/// good and the uptime label otherwise.
pub fn greeting_message(name: &str, at: Timestamp) -> MessageText {
    match at.time_of_day() {
        Some(tod) => compose(format_args!(
            "Hello {name}, you accessed the system at {tod}."
        )),
        None => compose(format_args!(
            "Hello {name}, you accessed the system at {at} after boot."
        )),
    }
}

pub fn denied_message(at: Timestamp) -> MessageText {
    compose(format_args!(
        "ACCESS DENIED\nUnknown fingerprint detected!\nTime: {at}"
    ))
}

pub fn enrolled_message(name: &str, id: UserId, at: Timestamp) -> MessageText {
    compose(format_args!(
        "NEW ENROLLMENT\nUser: {name}\nID: {id}\nTime: {at}"
    ))
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct NotificationDispatcher {
    admin_phone: String<PHONE_LEN>,
}

impl NotificationDispatcher {
    pub fn new(admin_phone: &str) -> Self {
        Self {
            admin_phone: truncated(admin_phone.trim()),
        }
    }

    pub fn admin_phone(&self) -> &str {
        &self.admin_phone
    }

    pub fn on_granted<K, U>(
        &self,
        id: UserId,
        registry: &UserRegistry,
        time: &mut TimeSource<K, U>,
        sender: &mut impl MessageSender,
    ) -> Result<DeliveryReport, NotifyError>
    where
        K: CalendarClock,
        U: Uptime,
    {
        let at = time.now();
        self.granted_at(id, registry, at, sender)
    }

    pub fn on_denied<K, U>(
        &self,
        time: &mut TimeSource<K, U>,
        sender: &mut impl MessageSender,
    ) -> Result<DeliveryReport, NotifyError>
    where
        K: CalendarClock,
        U: Uptime,
    {
        let at = time.now();
        self.denied_at(at, sender)
    }

    pub fn on_enrolled<K, U>(
        &self,
        id: UserId,
        name: &str,
        time: &mut TimeSource<K, U>,
        sender: &mut impl MessageSender,
    ) -> Result<DeliveryReport, NotifyError>
    where
        K: CalendarClock,
        U: Uptime,
    {
        self.admin_gate(&*sender)?;
        let at = time.now();
        let mut report = DeliveryReport::default();
        info!("notify: enrollment of {name} (id #{id})");
        report.record(sender.send_message(&self.admin_phone, &enrolled_message(name, id, at)));
        Ok(report)
    }

    /// Route an event whose timestamp was taken when it happened.
    pub fn dispatch(
        &self,
        event: &AccessEvent,
        registry: &UserRegistry,
        sender: &mut impl MessageSender,
    ) -> Result<DeliveryReport, NotifyError> {
        match (event.granted, event.id) {
            (true, Some(id)) => self.granted_at(id, registry, event.timestamp, sender),
            _ => self.denied_at(event.timestamp, sender),
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn granted_at(
        &self,
        id: UserId,
        registry: &UserRegistry,
        at: Timestamp,
        sender: &mut impl MessageSender,
    ) -> Result<DeliveryReport, NotifyError> {
        self.admin_gate(&*sender)?;
        let mut report = DeliveryReport::default();

        let Some(user) = registry.get(id) else {
            info!("notify: granted id #{id} has no registry record");
            report.record(sender.send_message(&self.admin_phone, &granted_message(None, id, at)));
            return Ok(report);
        };

        info!("notify: access granted to {} (id #{id})", user.name);
        report.record(
            sender.send_message(&self.admin_phone, &granted_message(Some(user.name.as_str()), id, at)),
        );
        if user.wants_notification() {
            report.record(sender.send_message(&user.phone, &greeting_message(&user.name, at)));
        }
        Ok(report)
    }

    fn denied_at(
        &self,
        at: Timestamp,
        sender: &mut impl MessageSender,
    ) -> Result<DeliveryReport, NotifyError> {
        self.admin_gate(&*sender)?;
        let mut report = DeliveryReport::default();
        info!("notify: access denied");
        report.record(sender.send_message(&self.admin_phone, &denied_message(at)));
        Ok(report)
    }

    fn admin_gate(&self, sender: &impl MessageSender) -> Result<(), NotifyError> {
        if !sender.is_ready() {
            return Err(NotifyError::Transport(TransportError::NotReady));
        }
        if self.admin_phone.is_empty() {
            return Err(NotifyError::NoRecipient);
        }
        Ok(())
    }
}
