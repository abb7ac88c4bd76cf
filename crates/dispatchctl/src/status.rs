//! Status reporter: user-visible narrative plus a busy flag.
//!
//! Reporters never fail. Anything that goes wrong while showing a message
//! is logged and dropped.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::{IsTerminal, Write};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

pub trait StatusReporter: Send + Sync {
    fn set_narrative(&self, text: &str);
    fn set_busy(&self, busy: bool);
}

/// Terminal reporter: coloured narrative lines and a spinner while busy.
pub struct ConsoleReporter {
    use_colors: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            use_colors: std::io::stdout().is_terminal(),
            spinner: Mutex::new(None),
        }
    }

    fn create_spinner(&self) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        let (ticks, template): (&[&str], _) = if self.use_colors {
            (
                &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
                "{spinner:.red} {msg}",
            )
        } else {
            (&["-", "\\", "|", "/"], "{spinner} {msg}")
        };

        match ProgressStyle::default_spinner().template(template) {
            Ok(style) => spinner.set_style(style.tick_strings(ticks)),
            Err(e) => warn!("Spinner template rejected: {}", e),
        }
        spinner.set_message("working...");
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }
}

impl StatusReporter for ConsoleReporter {
    fn set_narrative(&self, text: &str) {
        info!(narrative = text);
        let line = if self.use_colors {
            format!("{} {}", "●".red().bold(), text.bold())
        } else {
            format!("* {}", text)
        };

        let guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_ref() {
            // Print above the spinner so it keeps spinning underneath.
            Some(spinner) => spinner.println(line),
            None => {
                let mut stdout = std::io::stdout().lock();
                if let Err(e) = writeln!(stdout, "{}", line).and_then(|_| stdout.flush()) {
                    warn!("Failed to show narrative: {}", e);
                }
            }
        }
    }

    fn set_busy(&self, busy: bool) {
        let mut guard = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        match (busy, guard.is_some()) {
            (true, false) => *guard = Some(self.create_spinner()),
            (false, true) => {
                if let Some(spinner) = guard.take() {
                    spinner.finish_and_clear();
                }
            }
            _ => {}
        }
    }
}
