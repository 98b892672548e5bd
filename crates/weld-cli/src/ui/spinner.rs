//! Spinner for one-shot build steps.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Start a spinner. Hidden when stderr is not a terminal.
    pub fn new(message: &str) -> Self {
        let pb = if super::is_interactive() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };

        // The template is a literal; a parse failure would leave the default style.
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_strings(&["◐", "◓", "◑", "◒", "●"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    pub fn finish(&self, message: &str) {
        if self.pb.is_hidden() {
            super::success(message);
        } else {
            self.pb
                .finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    pub fn fail(&self, message: &str) {
        if self.pb.is_hidden() {
            super::error(message);
        } else {
            self.pb
                .finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }
}
