//! Schema-level validation of a merged configuration.
//!
//! Only checks that the configuration is self-consistent. Whether source
//! directories exist is decided later by the pipeline, since a missing source
//! directory skips its step rather than failing.

use std::path::{Component, Path};

use crate::config::SiteConfig;
use crate::error::{ConfigError, Result};

impl SiteConfig {
    pub fn validate(&self) -> Result<()> {
        let segments = [
            ("output.dir", &self.output.dir),
            ("output.scripts", &self.output.scripts),
            ("output.styles", &self.output.styles),
            ("output.templates", &self.output.templates),
            ("input.dir", &self.input.dir),
            ("input.main", &self.input.main),
            ("input.scripts", &self.input.scripts),
            ("input.styles", &self.input.styles),
            ("input.templates", &self.input.templates),
        ];

        for (field, value) in segments {
            validate_segment(field, value)?;
        }

        if self.serve.host.trim().is_empty() {
            return Err(ConfigError::invalid("serve.host", "must not be empty"));
        }

        if self.styles.uses(crate::StylePlugin::Autoprefixer) && self.styles.targets.is_empty() {
            return Err(ConfigError::invalid(
                "styles.targets",
                "autoprefixer needs at least one browserslist query",
            ));
        }

        Ok(())
    }
}

fn validate_segment(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }

    let escapes = Path::new(value)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ConfigError::invalid(
            field,
            format!("'{value}' must stay inside the project root"),
        ));
    }

    Ok(())
}
