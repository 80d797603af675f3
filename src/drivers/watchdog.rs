//! Task watchdog sized from the appliance's own timings.
//!
//! The control loop feeds the watchdog once per iteration, but a single
//! iteration may sit inside a blocking enrollment or a notification burst
//! for tens of seconds.  [`budget_ms`] works out the longest such stall
//! from [`SystemConfig`] so that a slow but healthy loop never trips it.
//!
//! On the host build there is no TWDT; the driver only records feeds.

use core::cell::Cell;

use crate::config::SystemConfig;

/// Allowance on top of the computed stall for sensor round trips and
/// logging.
const SLACK_MS: u32 = 10_000;
/// Never arm the watchdog tighter than this.
const MIN_BUDGET_MS: u32 = 30_000;

/// Worst-case time one control-loop iteration can block.
///
/// An enrollment waits out both capture stages, the lift pause and the
/// lift deadline, then reports to the admin.  A granted scan may message
/// both the admin and the user.  The larger of the two wins.
pub fn budget_ms(c: &SystemConfig) -> u32 {
    let message = c
        .address_settle_ms
        .saturating_add(c.payload_settle_ms)
        .saturating_add(c.message_timeout_ms);
    let enrollment = c
        .capture_timeout_ms
        .saturating_mul(2)
        .saturating_add(c.removal_delay_ms)
        .saturating_add(c.removal_timeout_ms)
        .saturating_add(message);
    let scan = message.saturating_mul(2);

    enrollment
        .max(scan)
        .saturating_add(SLACK_MS)
        .max(MIN_BUDGET_MS)
}

pub struct Watchdog {
    timeout_ms: u32,
    feeds: Cell<u32>,
    #[cfg(feature = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Arm the TWDT for `config` and subscribe the calling task.
    pub fn for_config(config: &SystemConfig) -> Self {
        let timeout_ms = budget_ms(config);

        #[cfg(feature = "espidf")]
        let subscribed = subscribe(timeout_ms);
        #[cfg(not(feature = "espidf"))]
        log::debug!("wdt(sim): budget {timeout_ms} ms, not armed");

        Self {
            timeout_ms,
            feeds: Cell::new(0),
            #[cfg(feature = "espidf")]
            subscribed,
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Feeds since startup.
    pub fn feeds(&self) -> u32 {
        self.feeds.get()
    }

    pub fn feed(&self) {
        self.feeds.set(self.feeds.get().wrapping_add(1));

        #[cfg(feature = "espidf")]
        {
            if self.subscribed {
                // SAFETY: the calling task was added to the TWDT in `subscribe`.
                unsafe {
                    esp_idf_svc::sys::esp_task_wdt_reset();
                }
            }
        }
    }
}

#[cfg(feature = "espidf")]
fn subscribe(timeout_ms: u32) -> bool {
    use esp_idf_svc::sys::{
        esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, ESP_OK,
    };
    use log::{info, warn};

    let cfg = esp_task_wdt_config_t {
        timeout_ms,
        idle_core_mask: 0,
        trigger_panic: true,
    };
    // SAFETY: plain FFI calls; the config outlives the reconfigure call and
    // a null handle means the current task.
    let (reconfigured, added) =
        unsafe { (esp_task_wdt_reconfigure(&cfg), esp_task_wdt_add(core::ptr::null_mut())) };

    if reconfigured != ESP_OK {
        warn!("wdt: reconfigure returned {reconfigured}");
    }
    if added == ESP_OK {
        info!("wdt: armed, {} s budget", timeout_ms / 1000);
        true
    } else {
        warn!("wdt: could not subscribe control task ({added})");
        false
    }
}
