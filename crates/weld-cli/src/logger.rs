//! Logging setup for the weld CLI.
//!
//! Verbosity is chosen from the global flags:
//!
//! 1. `--verbose`: debug level for weld crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`, when set
//! 4. otherwise info level for weld crates
//!
//! ```rust,no_run
//! use weld_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("page reload public/index.html");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "weld=debug,weld_cli=debug,weld_config=debug";
const QUIET_FILTER: &str = "weld=error,weld_cli=error,weld_config=error";
const DEFAULT_FILTER: &str = "weld=info,weld_cli=info,weld_config=info";

/// Pick the filter directive for the given flags. `None` means defer to
/// `RUST_LOG`.
fn filter_directive(verbose: bool, quiet: bool) -> Option<&'static str> {
    if verbose {
        Some(VERBOSE_FILTER)
    } else if quiet {
        Some(QUIET_FILTER)
    } else {
        None
    }
}

/// Initialize the global tracing subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = match filter_directive(verbose, quiet) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    init_logger_with_filter(filter, no_color);
}

/// Initialize with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    // A second init (e.g. from tests) is not an error worth surfacing.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Whether ANSI colors should be written.
///
/// `NO_COLOR` wins over `FORCE_COLOR`; otherwise the terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
