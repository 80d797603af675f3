//! Biometric engine — drives the fingerprint sensor through its
//! enroll / verify / delete state machines.
//!
//! ```text
//!  enroll(id):
//!   FirstImage ─▶ FirstConvert ─▶ RemoveFinger ─▶ SecondImage
//!        ─▶ SecondConvert ─▶ CreateModel ─▶ Store
//! ```
//!
//! Every wait is a busy poll bounded by wall-clock time taken from the
//! [`Uptime`] port; nothing else in the control loop runs meanwhile.
//! The template library is only touched by the final `Store` stage, so a
//! failure at any earlier stage leaves it exactly as it was.

use core::fmt;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::{CharBuffer, FingerprintSensor, SensorCode, SensorParameters, Uptime};
use crate::config::SystemConfig;
use crate::error::BiometricError;
use crate::registry::UserId;

// ---------------------------------------------------------------------------
// Stages and outcomes
// ---------------------------------------------------------------------------

/// Enrollment stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollStage {
    FirstImage,
    FirstConvert,
    RemoveFinger,
    SecondImage,
    SecondConvert,
    CreateModel,
    Store,
}

impl fmt::Display for EnrollStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstImage => write!(f, "waiting for first image"),
            Self::FirstConvert => write!(f, "converting first image"),
            Self::RemoveFinger => write!(f, "waiting for finger removal"),
            Self::SecondImage => write!(f, "waiting for second image"),
            Self::SecondConvert => write!(f, "converting second image"),
            Self::CreateModel => write!(f, "creating model"),
            Self::Store => write!(f, "storing template"),
        }
    }
}

/// Result of a search that actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The sample matched the template at `id`.
    Match { id: UserId, confidence: u16 },
    /// The library was searched and nothing matched.
    NoMatch,
}

/// Diagnostics snapshot of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorInfo {
    pub parameters: SensorParameters,
    pub templates_stored: u16,
}

/// Polling bounds for the enrollment waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollTiming {
    /// Maximum wait for a finger at each image stage.
    pub capture_timeout_ms: u32,
    /// Fixed pause after the first image before polling for removal.
    pub removal_delay_ms: u32,
    /// Maximum wait for the glass to report "no finger".
    pub removal_timeout_ms: u32,
    /// Pause between consecutive image polls.
    pub poll_interval_ms: u32,
}

impl From<&SystemConfig> for EnrollTiming {
    fn from(c: &SystemConfig) -> Self {
        Self {
            capture_timeout_ms: c.capture_timeout_ms,
            removal_delay_ms: c.removal_delay_ms,
            removal_timeout_ms: c.removal_timeout_ms,
            poll_interval_ms: c.image_poll_interval_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns the sensor channel exclusively.
pub struct BiometricEngine<S, C> {
    sensor: S,
    clock: C,
    timing: EnrollTiming,
}

impl<S, C> BiometricEngine<S, C>
where
    S: FingerprintSensor,
    C: Uptime + DelayNs,
{
    pub fn new(sensor: S, clock: C, timing: EnrollTiming) -> Self {
        Self {
            sensor,
            clock,
            timing,
        }
    }

    /// Sensor handshake.  Failure here is appliance-fatal.
    pub fn begin(&mut self) -> Result<SensorParameters, BiometricError> {
        self.sensor.verify_password().map_err(|code| {
            warn!("fp: sensor handshake failed ({code})");
            BiometricError::Sensor(code)
        })?;
        let params = self.sensor.parameters().map_err(BiometricError::Sensor)?;
        info!(
            "fp: sensor ready (capacity {}, security level {})",
            params.capacity, params.security_level
        );
        Ok(params)
    }

    /// Run the full two-sample enrollment and store the model at `id`.
    ///
    /// `on_stage` is called as each stage begins so the caller can prompt
    /// the user.
    pub fn enroll(
        &mut self,
        id: UserId,
        mut on_stage: impl FnMut(EnrollStage),
    ) -> Result<(), BiometricError> {
        info!("fp: enrolling id #{id}");

        on_stage(EnrollStage::FirstImage);
        self.wait_for_image(EnrollStage::FirstImage)?;

        on_stage(EnrollStage::FirstConvert);
        self.sensor
            .convert_image(CharBuffer::One)
            .map_err(BiometricError::Conversion)?;

        on_stage(EnrollStage::RemoveFinger);
        self.wait_for_removal()?;

        on_stage(EnrollStage::SecondImage);
        self.wait_for_image(EnrollStage::SecondImage)?;

        on_stage(EnrollStage::SecondConvert);
        self.sensor
            .convert_image(CharBuffer::Two)
            .map_err(BiometricError::Conversion)?;

        on_stage(EnrollStage::CreateModel);
        self.sensor.create_model().map_err(|code| match code {
            SensorCode::EnrollMismatch => BiometricError::Mismatch,
            other => BiometricError::Sensor(other),
        })?;

        on_stage(EnrollStage::Store);
        self.sensor.store_model(id).map_err(BiometricError::Store)?;

        info!("fp: id #{id} enrolled");
        Ok(())
    }

    /// Single-shot: capture, convert and search the whole library.
    ///
    /// `Err(Capture(NoFinger))` means nothing was on the glass; the search
    /// never ran.  `Ok(NoMatch)` means it ran and found nothing.
    pub fn verify(&mut self) -> Result<VerifyOutcome, BiometricError> {
        self.sensor.capture_image().map_err(BiometricError::Capture)?;
        self.sensor
            .convert_image(CharBuffer::One)
            .map_err(BiometricError::Conversion)?;

        match self.sensor.search() {
            Ok(hit) => {
                let id = UserId::try_from(hit.page).map_err(|_| {
                    warn!("fp: search returned page {} outside the id range", hit.page);
                    BiometricError::Sensor(SensorCode::BadLocation)
                })?;
                info!("fp: match id #{id} (confidence {})", hit.confidence);
                Ok(VerifyOutcome::Match {
                    id,
                    confidence: hit.confidence,
                })
            }
            Err(SensorCode::NotFound) => {
                info!("fp: no match found");
                Ok(VerifyOutcome::NoMatch)
            }
            Err(code) => Err(BiometricError::Sensor(code)),
        }
    }

    /// Remove the template at `id`.  An empty slot is a failure.
    pub fn delete_template(&mut self, id: UserId) -> Result<(), BiometricError> {
        let occupied = self.sensor.slot_occupied(id).map_err(BiometricError::Delete)?;
        if !occupied {
            warn!("fp: delete id #{id}: slot empty");
            return Err(BiometricError::EmptySlot);
        }
        self.sensor.delete_model(id).map_err(BiometricError::Delete)?;
        info!("fp: deleted id #{id}");
        Ok(())
    }

    /// Sensor-reported template count (diagnostics).
    pub fn template_count(&mut self) -> Result<u16, BiometricError> {
        self.sensor.template_count().map_err(BiometricError::Sensor)
    }

    pub fn sensor_info(&mut self) -> Result<SensorInfo, BiometricError> {
        let parameters = self.sensor.parameters().map_err(BiometricError::Sensor)?;
        let templates_stored = self.template_count()?;
        Ok(SensorInfo {
            parameters,
            templates_stored,
        })
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    // ── Internal waits ────────────────────────────────────────

    /// Poll until an image is captured.  "No finger" keeps waiting; any
    /// other status is a hard capture failure.
    fn wait_for_image(&mut self, stage: EnrollStage) -> Result<(), BiometricError> {
        let start = self.clock.uptime_ms();
        loop {
            match self.sensor.capture_image() {
                Ok(()) => {
                    debug!("fp: image captured ({stage})");
                    return Ok(());
                }
                Err(SensorCode::NoFinger) => {}
                Err(code) => {
                    warn!("fp: image capture failed ({code})");
                    return Err(BiometricError::Capture(code));
                }
            }
            if self.elapsed_since(start) >= u64::from(self.timing.capture_timeout_ms) {
                warn!("fp: timed out {stage}");
                return Err(BiometricError::Timeout(stage));
            }
            self.clock.delay_ms(self.timing.poll_interval_ms);
        }
    }

    /// Pause, then poll until the sensor reports an empty glass.
    fn wait_for_removal(&mut self) -> Result<(), BiometricError> {
        self.clock.delay_ms(self.timing.removal_delay_ms);
        let start = self.clock.uptime_ms();
        loop {
            if let Err(SensorCode::NoFinger) = self.sensor.capture_image() {
                return Ok(());
            }
            if self.elapsed_since(start) >= u64::from(self.timing.removal_timeout_ms) {
                warn!("fp: finger was not removed");
                return Err(BiometricError::Timeout(EnrollStage::RemoveFinger));
            }
            self.clock.delay_ms(self.timing.poll_interval_ms);
        }
    }

    fn elapsed_since(&self, start: u64) -> u64 {
        self.clock.uptime_ms().saturating_sub(start)
    }
}
