//! Log-backed display adapter.
//!
//! Stands in for the 16x2 character LCD: every screen update becomes one
//! `lcd:` log line.  Layout (centering, scrolling) belongs to a real panel
//! driver, not here.

use log::info;

use crate::app::ports::DisplayPort;

/// Screen lines beyond this are dropped.
pub const MAX_LINES: usize = 4;

pub struct LogDisplay {
    backlight: bool,
}

impl Default for LogDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl LogDisplay {
    pub fn new() -> Self {
        Self { backlight: true }
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }
}

impl DisplayPort for LogDisplay {
    fn show(&mut self, lines: &[&str]) {
        let shown = &lines[..lines.len().min(MAX_LINES)];
        info!("lcd: {}", shown.join(" | "));
    }

    fn set_backlight(&mut self, on: bool) {
        self.backlight = on;
        info!("lcd: backlight {}", if on { "on" } else { "off" });
    }
}
