//! Script and stylesheet build options.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsOptions {
    pub minify: bool,
    pub sourcemap: bool,
}

impl Default for ScriptsOptions {
    fn default() -> Self {
        Self {
            minify: true,
            sourcemap: false,
        }
    }
}

/// A stylesheet transform, applied in the order listed under `styles.postcss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StylePlugin {
    /// Inline `@import` rules.
    Import,
    /// Lower CSS nesting for the configured targets.
    Nesting,
    /// Add vendor prefixes for the configured browserslist targets.
    Autoprefixer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesOptions {
    pub minify: bool,
    pub postcss: Vec<StylePlugin>,
    /// Browserslist queries.
    pub targets: Vec<String>,
}

impl Default for StylesOptions {
    fn default() -> Self {
        Self {
            minify: true,
            postcss: Vec::new(),
            targets: vec!["defaults".into()],
        }
    }
}

impl StylesOptions {
    pub fn uses(&self, plugin: StylePlugin) -> bool {
        self.postcss.contains(&plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_list_parses_in_order() {
        let styles: StylesOptions =
            serde_json::from_str(r#"{ "postcss": ["import", "nesting", "autoprefixer"] }"#)
                .unwrap();
        assert_eq!(
            styles.postcss,
            vec![
                StylePlugin::Import,
                StylePlugin::Nesting,
                StylePlugin::Autoprefixer
            ]
        );
        assert!(styles.uses(StylePlugin::Nesting));
        assert!(styles.minify);
    }

    #[test]
    fn unknown_plugin_is_rejected() {
        let result = serde_json::from_str::<StylesOptions>(r#"{ "postcss": ["tailwind"] }"#);
        assert!(result.is_err());
    }
}
