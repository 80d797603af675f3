//! FpAccess Firmware — Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  R30x (UART2)    Modem (UART1)    Ds3231 (I²C)   SystemTimer   │
//! │  LogDisplay      LogEventSink     Watchdog                     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Appliance (pure logic)                    │    │
//! │  │  BiometricEngine · UserRegistry · Notifications        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use embedded_hal::delay::DelayNs;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use fpaccess::adapters::log_display::LogDisplay;
use fpaccess::adapters::log_sink::LogEventSink;
use fpaccess::adapters::time::SystemTimer;
use fpaccess::adapters::uart::UartTransport;
use fpaccess::app::service::Appliance;
use fpaccess::config::SystemConfig;
use fpaccess::drivers::ds3231::Ds3231;
use fpaccess::drivers::r30x::R30x;
use fpaccess::drivers::watchdog::Watchdog;
use fpaccess::pins;

/// Optional JSON override baked in at build time.
const CONFIG_JSON: Option<&str> = option_env!("FPACCESS_CONFIG_JSON");

fn load_config() -> SystemConfig {
    match CONFIG_JSON.map(SystemConfig::from_json) {
        Some(Ok(cfg)) => {
            info!("Config loaded from FPACCESS_CONFIG_JSON");
            cfg
        }
        Some(Err(e)) => {
            warn!("Built-in config rejected ({}), using defaults", e);
            SystemConfig::default()
        }
        None => SystemConfig::default(),
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  FpAccess v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = load_config();
    if config.admin_phone.is_empty() {
        warn!("No admin phone configured; notifications will fail");
    }

    // ── 2. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;

    // SAFETY: each GPIO number below is claimed exactly once, here.
    let (fp_tx, fp_rx, gsm_tx, gsm_rx, sda, scl) = unsafe {
        (
            AnyIOPin::new(pins::FP_UART_TX_GPIO),
            AnyIOPin::new(pins::FP_UART_RX_GPIO),
            AnyIOPin::new(pins::GSM_UART_TX_GPIO),
            AnyIOPin::new(pins::GSM_UART_RX_GPIO),
            AnyIOPin::new(pins::I2C_SDA_GPIO),
            AnyIOPin::new(pins::I2C_SCL_GPIO),
        )
    };

    let fp_uart = UartDriver::new(
        peripherals.uart2,
        fp_tx,
        fp_rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(config.sensor_baud)),
    )?;
    let gsm_uart = UartDriver::new(
        peripherals.uart1,
        gsm_tx,
        gsm_rx,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(config.modem_baud)),
    )?;
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        sda,
        scl,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;

    let mut ds3231 = Ds3231::new(i2c);
    let rtc = if ds3231.probe() {
        Some(ds3231)
    } else {
        warn!("DS3231 did not answer on I2C");
        None
    };

    // ── 3. Appliance ──────────────────────────────────────────
    let mut timer = SystemTimer::new();
    let sensor = R30x::new(
        UartTransport::new(fp_uart),
        timer.clone(),
        config.sensor_password,
    );
    let mut app = Appliance::new(
        sensor,
        UartTransport::new(gsm_uart),
        rtc,
        timer.clone(),
        config.clone(),
    );
    let mut display = LogDisplay::new();
    let mut sink = LogEventSink::new();
    let watchdog = Watchdog::for_config(app.config());

    if let Err(e) = app.start(&mut display, &mut sink) {
        // Without the sensor the appliance has no purpose.  Stop feeding
        // the watchdog so it resets the chip and boot is retried.
        error!("Startup failed: {}, halting", e);
        loop {
            timer.delay_ms(1_000);
        }
    }

    // ── 4. Control loop ───────────────────────────────────────
    loop {
        watchdog.feed();
        app.poll_once(&mut display, &mut sink);
        timer.delay_ms(app.config().scan_interval_ms);
    }
}
