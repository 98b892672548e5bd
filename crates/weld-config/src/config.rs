//! The effective site configuration and the layer merge.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assets::{ScriptsOptions, StylesOptions};
use crate::error::{ConfigError, Result};
use crate::paths::{InputPaths, OutputPaths};
use crate::serve::{Mode, ServeOptions};

/// Effective configuration for one weld invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Project root. Relative values are resolved against the directory the
    /// configuration was discovered in.
    pub root: PathBuf,
    pub output: OutputPaths,
    pub input: InputPaths,
    pub serve: ServeOptions,
    pub scripts: ScriptsOptions,
    pub styles: StylesOptions,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::defaults(".")
    }
}

impl SiteConfig {
    /// Built-in defaults rooted at `root`.
    pub fn defaults(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: OutputPaths::default(),
            input: InputPaths::default(),
            serve: ServeOptions::default(),
            scripts: ScriptsOptions::default(),
            styles: StylesOptions::default(),
        }
    }

    /// Deserialize a complete configuration.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut config: SiteConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
                field: "config".to_string(),
                hint: Some(e.to_string()),
            })?;
        config.output.normalize();
        config.input.normalize();
        Ok(config)
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Fold override layers over `self`, in order. Later layers win.
    ///
    /// `Null` layers are skipped, so a missing config file can be passed
    /// through as `Value::Null`.
    pub fn merged<I>(self, layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut base = self.to_value()?;
        for layer in layers {
            match layer {
                Value::Null => continue,
                Value::Object(_) => merge_values(&mut base, &layer),
                other => {
                    return Err(ConfigError::InvalidOverride {
                        message: format!("expected a table of settings, found {other}"),
                    });
                }
            }
        }
        Self::from_value(base)
    }

    /// Returns the config with `serve.mode` set; tasks call this once before
    /// running any step.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.serve.mode = mode;
        self
    }

    pub fn mode(&self) -> Mode {
        self.serve.mode
    }

    /// Resolve a configured segment against the project root.
    pub fn resolve(&self, segment: &str) -> PathBuf {
        self.root.join(segment)
    }

    /// Anchor a relative `root` at `base`.
    pub fn anchored_at(mut self, base: &Path) -> Self {
        if self.root.is_relative() {
            self.root = path_clean::clean(base.join(&self.root));
        }
        self
    }
}

/// Recursively merge `update` into `target`.
///
/// - object over object: merged key by key
/// - object over anything else: replaces it
/// - arrays are replaced wholesale, never concatenated
/// - scalars (including `null`) replace
pub fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                let slot = target_map.entry(key.clone()).or_insert(Value::Null);
                merge_values(slot, value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}
