//! Appliance — the hexagonal core.
//!
//! [`Appliance`] is the single context object: it owns the biometric
//! engine, the modem, the user registry, the time source and the
//! notification dispatcher.  Display and event sink are injected at call
//! sites, so the whole control loop runs against mock adapters in tests.
//!
//! ```text
//!  FingerprintSensor ──▶ ┌──────────────────────────┐ ──▶ DisplayPort
//!  CalendarClock     ──▶ │        Appliance         │ ──▶ EventSink
//!  Transport (modem) ◀──▶│ engine · registry · time │
//!                        └──────────────────────────┘
//! ```
//!
//! Everything runs on the caller's thread.  One [`poll_once`] produces at
//! most one access outcome, and every message it triggers has completed
//! or timed out before it returns.
//!
//! [`poll_once`]: Appliance::poll_once

use embedded_hal::delay::DelayNs;
use heapless::String;
use log::{info, warn};

use crate::biometric::{BiometricEngine, EnrollStage, EnrollTiming, VerifyOutcome};
use crate::config::SystemConfig;
use crate::error::{BiometricError, Error, NotifyError};
use crate::modem::{Modem, ModemTiming};
use crate::notify::{AccessEvent, NotificationDispatcher};
use crate::registry::{truncated, UserId, UserRegistry, NAME_LEN, PHONE_LEN};
use crate::timekeeping::{TimeSource, Timestamp};
use crate::transport::Transport;

use super::commands::{AppCommand, CommandReply};
use super::events::{AppEvent, Setting};
use super::ports::{CalendarClock, DisplayPort, EventSink, FingerprintSensor, SensorCode, Uptime};

/// Body of the operator's test message.
pub const TEST_MESSAGE: &str = "Test message from fingerprint system";

// ───────────────────────────────────────────────────────────────
// Appliance
// ───────────────────────────────────────────────────────────────

pub struct Appliance<S, T, K, C> {
    engine: BiometricEngine<S, C>,
    modem: Modem<T, C>,
    registry: UserRegistry,
    time: TimeSource<K, C>,
    dispatcher: NotificationDispatcher,
    config: SystemConfig,
    clock: C,
    backlight: bool,
    /// Last identity notified and when (uptime ms).
    last_notified: Option<(UserId, u64)>,
}

impl<S, T, K, C> Appliance<S, T, K, C>
where
    S: FingerprintSensor,
    T: Transport,
    K: CalendarClock,
    C: Uptime + DelayNs + Clone,
{
    /// Wire the components together.  Nothing talks to hardware until
    /// [`start`](Self::start).
    pub fn new(sensor: S, modem_link: T, rtc: Option<K>, clock: C, config: SystemConfig) -> Self {
        Self {
            engine: BiometricEngine::new(sensor, clock.clone(), EnrollTiming::from(&config)),
            modem: Modem::new(modem_link, clock.clone(), ModemTiming::from(&config)),
            registry: UserRegistry::new(),
            time: TimeSource::new(rtc, clock.clone()),
            dispatcher: NotificationDispatcher::new(&config.admin_phone),
            config,
            clock,
            backlight: true,
            last_notified: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring up clock, sensor and modem, in that order.  Only a sensor
    /// failure is returned; the clock and modem degrade.
    pub fn start(
        &mut self,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        display.set_backlight(self.backlight);
        display.show(&["Initializing..."]);

        let clock_seeded = match self.time.begin() {
            Ok(seeded) => seeded,
            Err(e) => {
                warn!("rtc: {e}, continuing in degraded time mode");
                false
            }
        };

        let params = match self.engine.begin() {
            Ok(p) => p,
            Err(e) => {
                display.show(&["Sensor not found!"]);
                return Err(e.into());
            }
        };

        if let Err(e) = self.modem.begin() {
            warn!("gsm: {e}, notifications disabled");
            display.show(&["GSM not ready"]);
        }

        sink.emit(&AppEvent::Started {
            sensor_capacity: params.capacity,
            modem_ready: self.modem.is_ready(),
            clock_present: self.time.has_clock(),
            clock_seeded,
        });
        info!("app: ready ({} users)", self.registry.len());
        display.show(&["System Ready", "Place finger"]);
        Ok(())
    }

    // ── Control loop ──────────────────────────────────────────

    /// One control-loop iteration: a single verify poll and, if a finger
    /// was seen, its notifications.
    pub fn poll_once(
        &mut self,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> Option<AccessEvent> {
        if !self.config.auto_verify {
            return None;
        }
        match self.engine.verify() {
            Ok(outcome) => Some(self.resolve(outcome, true, display, sink)),
            Err(e) if e.is_no_finger() => {
                // Lifting the finger ends a presentation; the next touch
                // is notified even inside the repeat window.
                self.last_notified = None;
                None
            }
            Err(e) => {
                warn!("fp: scan failed ({e})");
                display.show(&["Scan error", "Try again"]);
                sink.emit(&AppEvent::ScanFailed(e));
                None
            }
        }
    }

    // ── User management ───────────────────────────────────────

    /// Enroll a finger at `id`.  The registry is written only after the
    /// template is stored; the admin is told afterwards.
    pub fn enroll_user(
        &mut self,
        id: u8,
        name: &str,
        phone: &str,
        notify_on_access: bool,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> Result<UserId, Error> {
        let uid = UserId::new(id)?;

        let enrolled = self.engine.enroll(uid, |stage| {
            display.show(stage_prompt(stage));
            sink.emit(&AppEvent::EnrollProgress(stage));
        });
        if let Err(error) = enrolled {
            display.show(&["Enroll failed", enroll_failure_hint(error)]);
            sink.emit(&AppEvent::EnrollFailed { id: uid, error });
            return Err(error.into());
        }

        let record = self.registry.add_user(id, name, phone, notify_on_access)?;
        let stored_name: String<NAME_LEN> = record.name.clone();
        sink.emit(&AppEvent::Enrolled(uid));
        display.show(&["Enrolled!", stored_name.as_str()]);

        match self
            .dispatcher
            .on_enrolled(uid, &stored_name, &mut self.time, &mut self.modem)
        {
            Ok(report) => sink.emit(&AppEvent::Notified(report)),
            Err(e) => {
                warn!("notify: enrollment message not sent ({e})");
                sink.emit(&AppEvent::NotifyFailed(e));
            }
        }
        Ok(uid)
    }

    /// Delete the template, then the registry record.  A failed template
    /// delete leaves the record in place.
    pub fn delete_user(
        &mut self,
        id: u8,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> Result<UserId, Error> {
        let uid = UserId::new(id)?;
        if let Err(error) = self.engine.delete_template(uid) {
            display.show(&["Delete failed"]);
            sink.emit(&AppEvent::DeleteFailed { id: uid, error });
            return Err(error.into());
        }
        self.registry.remove_user(id)?;
        sink.emit(&AppEvent::Deleted(uid));
        display.show(&["User deleted"]);
        Ok(uid)
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandReply, Error> {
        match cmd {
            AppCommand::Enroll {
                id,
                name,
                phone,
                notify,
            } => self
                .enroll_user(id, &name, &phone, notify, display, sink)
                .map(CommandReply::Enrolled),
            AppCommand::Verify => self.verify_with_retries(display, sink),
            AppCommand::Delete(id) => self.delete_user(id, display, sink).map(CommandReply::Deleted),
            AppCommand::ListUsers => {
                for user in self.registry.list_users() {
                    info!(
                        "user: #{} {} {} notify={}",
                        user.id, user.name, user.phone, user.notify_on_access
                    );
                }
                let count = self.registry.len();
                info!("user: {count} registered");
                Ok(CommandReply::UserCount(count))
            }
            AppCommand::SensorInfo => {
                let info = self.engine.sensor_info()?;
                info!(
                    "fp: capacity {} security {} packet {}B baud x{} stored {}",
                    info.parameters.capacity,
                    info.parameters.security_level,
                    info.parameters.packet_len,
                    info.parameters.baud_multiplier,
                    info.templates_stored
                );
                Ok(CommandReply::Sensor(info))
            }
            AppCommand::SendTestMessage => {
                let admin = self.admin_phone()?;
                self.modem.send_message(&admin, TEST_MESSAGE)?;
                Ok(CommandReply::Done)
            }
            AppCommand::TestCall => {
                let admin = self.admin_phone()?;
                self.modem.place_call(&admin)?;
                Ok(CommandReply::Done)
            }
            AppCommand::ToggleAutoNotify => {
                self.config.auto_notify = !self.config.auto_notify;
                Ok(self.toggled(Setting::AutoNotify, self.config.auto_notify, sink))
            }
            AppCommand::ToggleAutoVerify => {
                self.config.auto_verify = !self.config.auto_verify;
                Ok(self.toggled(Setting::AutoVerify, self.config.auto_verify, sink))
            }
            AppCommand::ToggleBacklight => {
                self.backlight = !self.backlight;
                display.set_backlight(self.backlight);
                Ok(self.toggled(Setting::Backlight, self.backlight, sink))
            }
            AppCommand::SetTime(at) => {
                self.time.set_time(at)?;
                let now = self.time.now();
                sink.emit(&AppEvent::ClockSet(now));
                Ok(CommandReply::Time(now))
            }
            AppCommand::ShowTime => {
                let now = self.time.now();
                let mut line: String<24> = String::new();
                let _ = core::fmt::write(&mut line, format_args!("{now}"));
                display.show(&["Current time", line.as_str()]);
                Ok(CommandReply::Time(now))
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn registry(&self) -> &UserRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn modem(&self) -> &Modem<T, C> {
        &self.modem
    }

    pub fn engine(&self) -> &BiometricEngine<S, C> {
        &self.engine
    }

    pub fn now(&mut self) -> Timestamp {
        self.time.now()
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    // ── Internal ──────────────────────────────────────────────

    /// Operator verify: poll up to `verify_attempts` times for a finger.
    /// Repeat suppression does not apply to explicit requests.
    fn verify_with_retries(
        &mut self,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandReply, Error> {
        display.show(&["Place finger"]);
        for attempt in 1..=self.config.verify_attempts {
            match self.engine.verify() {
                Ok(outcome) => {
                    self.resolve(outcome, false, display, sink);
                    return Ok(CommandReply::Verified(outcome));
                }
                Err(e) if e.is_no_finger() => {
                    if attempt < self.config.verify_attempts {
                        self.clock.delay_ms(self.config.scan_interval_ms);
                    }
                }
                Err(e) => {
                    display.show(&["Scan error", "Try again"]);
                    sink.emit(&AppEvent::ScanFailed(e));
                    return Err(e.into());
                }
            }
        }
        display.show(&["No finger detected"]);
        Err(BiometricError::Capture(SensorCode::NoFinger).into())
    }

    /// Turn a verify outcome into an access event, show it and notify.
    fn resolve(
        &mut self,
        outcome: VerifyOutcome,
        suppress_repeats: bool,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) -> AccessEvent {
        let timestamp = self.time.now();
        let event = match outcome {
            VerifyOutcome::Match { id, .. } => {
                match self.registry.get(id) {
                    Some(user) => display.show(&["Access Granted", user.name.as_str()]),
                    None => display.show(&["Access Granted", "Unknown record"]),
                }
                AccessEvent::granted(id, timestamp)
            }
            VerifyOutcome::NoMatch => {
                display.show(&["Access Denied", "Unknown finger"]);
                AccessEvent::denied(timestamp)
            }
        };
        sink.emit(&AppEvent::Access(event));

        if self.config.auto_notify {
            self.notify(&event, suppress_repeats, sink);
        }
        event
    }

    fn notify(&mut self, event: &AccessEvent, suppress_repeats: bool, sink: &mut impl EventSink) {
        let now_ms = self.clock.uptime_ms();
        if let Some(id) = event.id {
            let window = u64::from(self.config.duplicate_window_ms);
            let repeat = matches!(
                self.last_notified,
                Some((last, at)) if last == id && now_ms.saturating_sub(at) < window
            );
            if suppress_repeats && repeat {
                info!("notify: id #{id} seen again, not re-notifying");
                sink.emit(&AppEvent::NotifySuppressed(id));
                return;
            }
            self.last_notified = Some((id, now_ms));
        }

        match self
            .dispatcher
            .dispatch(event, &self.registry, &mut self.modem)
        {
            Ok(report) => sink.emit(&AppEvent::Notified(report)),
            Err(e) => {
                warn!("notify: {e}");
                sink.emit(&AppEvent::NotifyFailed(e));
            }
        }
    }

    fn admin_phone(&self) -> Result<String<PHONE_LEN>, Error> {
        let admin = self.dispatcher.admin_phone();
        if admin.is_empty() {
            return Err(NotifyError::NoRecipient.into());
        }
        Ok(truncated(admin))
    }

    fn toggled(&self, setting: Setting, enabled: bool, sink: &mut impl EventSink) -> CommandReply {
        info!("app: {setting:?} {}", if enabled { "on" } else { "off" });
        sink.emit(&AppEvent::SettingChanged { setting, enabled });
        CommandReply::Toggled(enabled)
    }
}

/// Display lines for each enrollment stage.
fn stage_prompt(stage: EnrollStage) -> &'static [&'static str] {
    match stage {
        EnrollStage::FirstImage => &["Place finger"],
        EnrollStage::RemoveFinger => &["Remove finger"],
        EnrollStage::SecondImage => &["Place same", "finger again"],
        EnrollStage::FirstConvert | EnrollStage::SecondConvert => &["Processing..."],
        EnrollStage::CreateModel => &["Creating model"],
        EnrollStage::Store => &["Storing..."],
    }
}

fn enroll_failure_hint(error: BiometricError) -> &'static str {
    match error {
        BiometricError::Mismatch => "Fingers differ",
        BiometricError::Timeout(_) => "Timed out",
        BiometricError::Store(_) => "Store error",
        _ => "Sensor error",
    }
}
