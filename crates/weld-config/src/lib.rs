//! Configuration for the weld static-site pipeline.
//!
//! A [`SiteConfig`] is produced once per process by folding configuration
//! layers over the built-in defaults:
//!
//! 1. defaults ([`SiteConfig::defaults`])
//! 2. the project config file (`weld.toml`, `weld.config.json` or the `weld`
//!    field of `package.json`)
//! 3. `WELD_*` environment variables (`__` separates nested keys)
//! 4. caller supplied overrides (CLI flags)
//!
//! Layers are merged with [`merge_values`]: maps merge key by key, arrays and
//! scalars are replaced wholesale.

pub mod assets;
pub mod config;
pub mod discovery;
pub mod error;
pub mod paths;
pub mod serve;
pub mod validation;

pub use assets::{ScriptsOptions, StylePlugin, StylesOptions};
pub use config::{SiteConfig, merge_values};
pub use discovery::{ConfigDiscovery, ENV_PREFIX};
pub use error::{ConfigError, Result};
pub use paths::{InputPaths, OutputPaths};
pub use serve::{Mode, ServeOptions};
