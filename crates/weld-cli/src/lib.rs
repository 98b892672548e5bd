//! weld - a small static site pipeline.
//!
//! weld bundles scripts with rolldown, processes stylesheets with
//! lightningcss and renders templates with minijinja, then serves the result
//! with a live-reload development server.
//!
//! - [`cli`] - command-line definition; one subcommand per task
//! - [`config`] - loading the effective [`weld_config::SiteConfig`]
//! - [`pipeline`] - task planning and execution
//! - [`steps`] - the three build steps and output writing
//! - [`dev`] - development server, clean URLs and the reload decision
//! - [`error`], [`logger`], [`ui`] - errors, tracing setup and terminal output
//!
//! ```rust,no_run
//! use weld_cli::pipeline::{Pipeline, Task};
//!
//! # async fn example() -> weld_cli::Result<()> {
//! let config = weld_config::ConfigDiscovery::new(".").load()?;
//! Pipeline::new(config).run(Task::Templates).await
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod pipeline;
pub mod steps;
pub mod ui;

pub use error::{BuildError, CliError, ConfigError, Result, ResultExt};
pub use pipeline::{Pipeline, Task};
