//! File and environment based config discovery for CLI use.
//!
//! Each source is read through a figment provider into a plain JSON layer;
//! the layers are then folded with [`merge_values`](crate::merge_values) so the
//! merge policy stays explicit instead of being inherited from the provider.

use std::fs;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Toml};
use serde_json::Value;

use crate::config::SiteConfig;
use crate::error::{ConfigError, Result};

/// Prefix for environment overrides, e.g. `WELD_SERVE__PORT=4000`.
pub const ENV_PREFIX: &str = "WELD_";

const TOML_NAME: &str = "weld.toml";
const JSON_NAME: &str = "weld.config.json";
const PACKAGE_FIELD: &str = "weld";

/// Finds and loads weld configuration for a project directory.
///
/// # Example
///
/// ```no_run
/// use weld_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new(".").load().unwrap();
/// println!("serving {}", config.output.dir);
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
    explicit: Option<PathBuf>,
    read_env: bool,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            explicit: None,
            read_env: true,
        }
    }

    /// Use this file instead of searching. A missing explicit file is an error.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Skip the `WELD_*` environment layer.
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Find a config file in the root directory.
    ///
    /// Searches in this order:
    /// 1. `weld.toml`
    /// 2. `weld.config.json`
    /// 3. `package.json` with a `weld` field
    pub fn find(&self) -> Option<PathBuf> {
        for name in [TOML_NAME, JSON_NAME] {
            let path = self.root.join(name);
            if path.is_file() {
                return Some(path);
            }
        }

        let pkg_path = self.root.join("package.json");
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed: Value = serde_json::from_str(&content).ok()?;
        match parsed.get(PACKAGE_FIELD) {
            Some(field) if !field.is_null() => Some(pkg_path),
            _ => None,
        }
    }

    /// Read the file layer. No config file is an empty layer, not an error.
    pub fn file_layer(&self) -> Result<Value> {
        let path = match &self.explicit {
            Some(path) if !path.is_file() => return Err(ConfigError::NotFound),
            Some(path) => path.clone(),
            None => match self.find() {
                Some(path) => path,
                None => {
                    tracing::debug!("no config file in {}", self.root.display());
                    return Ok(Value::Null);
                }
            },
        };

        tracing::debug!("loading config from {}", path.display());
        read_file(&path)
    }

    /// Read the `WELD_*` environment layer.
    pub fn env_layer(&self) -> Result<Value> {
        if !self.read_env {
            return Ok(Value::Null);
        }
        Figment::from(Env::prefixed(ENV_PREFIX).split("__"))
            .extract::<Value>()
            .map_err(|e| ConfigError::invalid("environment", e.to_string()))
    }

    /// Defaults, then file, then environment.
    pub fn load(&self) -> Result<SiteConfig> {
        self.load_with(Value::Null)
    }

    /// Like [`load`](Self::load) with a final override layer on top.
    pub fn load_with(&self, overrides: Value) -> Result<SiteConfig> {
        if !self.root.is_dir() {
            return Err(ConfigError::RootNotFound(self.root.clone()));
        }

        let layers = [self.file_layer()?, self.env_layer()?, overrides];
        let config = SiteConfig::defaults(".")
            .merged(layers)?
            .anchored_at(&self.root);

        config.validate()?;
        Ok(config)
    }
}

fn read_file(path: &Path) -> Result<Value> {
    let is_package = path.file_name() == Some(std::ffi::OsStr::new("package.json"));
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");

    let figment = if is_toml {
        Figment::from(Toml::file(path))
    } else if is_package {
        Figment::from(Json::file(path)).focus(PACKAGE_FIELD)
    } else {
        Figment::from(Json::file(path))
    };

    figment
        .extract::<Value>()
        .map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
