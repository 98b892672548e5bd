//! Terminal status output.
//!
//! Status lines go to stderr so piped output stays clean. Spinners are only
//! drawn on an attended terminal.
//!
//! ```no_run
//! use weld_cli::ui;
//!
//! let spinner = ui::Spinner::new("Building styles...");
//! spinner.finish("Built 2 stylesheets");
//! ui::warning("src/scripts not found, skipping");
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

mod format;
mod messages;
mod spinner;

pub use format::{format_duration, relative_display};
pub use messages::{error, info, success, warning};
pub use spinner::Spinner;

static COLORS: AtomicBool = AtomicBool::new(true);

/// Turn colored status lines on or off for the rest of the process.
pub fn set_colors(enabled: bool) {
    COLORS.store(enabled, Ordering::Relaxed);
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

/// Whether a human is watching stderr. Spinners are hidden otherwise.
pub fn is_interactive() -> bool {
    if std::env::var_os("CI").is_some() {
        return false;
    }
    console::user_attended_stderr()
}
