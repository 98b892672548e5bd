//! Error types for the weld CLI.
//!
//! - [`CliError`] is what commands return; it converts from the domain errors
//!   below via `#[from]`.
//! - [`BuildError`] covers the three build steps and output writing.
//! - [`weld_config::ConfigError`] is re-exported for configuration failures.
//!
//! At the binary boundary errors become `miette` reports, see
//! [`cli_error_to_miette`].
//!
//! ```rust,no_run
//! use weld_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_page(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).with_path(path)
//! }
//! ```

mod diagnostic;

use std::path::PathBuf;

use thiserror::Error;

pub use diagnostic::{build_error_to_miette, cli_error_to_miette};
pub use weld_config::ConfigError;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The development server could not start or stopped with an error.
    #[error("Server error: {0}")]
    Server(String),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

}

/// Failures of a single build step.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The script bundler reported one or more errors.
    #[error("Script bundling failed: {0}\n\nHint: Check the import paths in your script entries")]
    Scripts(String),

    #[error("Stylesheet error in {}: {error}", .file.display())]
    Styles { file: PathBuf, error: String },

    #[error("Template error in {}: {error}", .file.display())]
    Templates { file: PathBuf, error: String },

    #[error("Failed to write output: {0}\n\nHint: Check output directory permissions")]
    WriteFailed(String),

    /// An output file would land outside its output directory.
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Adds context to fallible results.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }
}
