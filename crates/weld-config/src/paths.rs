//! Source and output directory layout.
//!
//! All values are forward-slash path segments relative to the project root.
//! They double as URL segments (`/public/...`, `/src/...`), which is why they
//! are kept as strings rather than `PathBuf`.

use serde::{Deserialize, Serialize};

/// Where generated, servable artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    /// Output root; also the directory served at `/` by the dev server.
    pub dir: String,
    /// Bundled scripts.
    pub scripts: String,
    /// Processed stylesheets.
    pub styles: String,
    /// Rendered pages.
    pub templates: String,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            dir: "public".into(),
            scripts: "public/assets".into(),
            styles: "public/assets".into(),
            templates: "public".into(),
        }
    }
}

/// Where sources live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub dir: String,
    /// JSON file whose top-level object becomes the template globals.
    pub main: String,
    pub scripts: String,
    pub styles: String,
    pub templates: String,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            dir: "src".into(),
            main: "src/main.json".into(),
            scripts: "src/scripts".into(),
            styles: "src/styles".into(),
            templates: "src/templates".into(),
        }
    }
}

/// Normalize a configured segment: forward slashes, no leading `./` or `/`,
/// no trailing `/`.
pub fn normalize_segment(segment: &str) -> String {
    let unified = segment.replace('\\', "/");
    let mut trimmed = unified.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.trim_matches('/').to_string()
}

impl OutputPaths {
    pub(crate) fn normalize(&mut self) {
        for value in [
            &mut self.dir,
            &mut self.scripts,
            &mut self.styles,
            &mut self.templates,
        ] {
            *value = normalize_segment(value);
        }
    }
}

impl InputPaths {
    pub(crate) fn normalize(&mut self) {
        for value in [
            &mut self.dir,
            &mut self.main,
            &mut self.scripts,
            &mut self.styles,
            &mut self.templates,
        ] {
            *value = normalize_segment(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_slashes_and_dot_prefix() {
        assert_eq!(normalize_segment("./public/"), "public");
        assert_eq!(normalize_segment("/public/assets"), "public/assets");
        assert_eq!(normalize_segment("public\\assets"), "public/assets");
        assert_eq!(normalize_segment("public"), "public");
    }

    #[test]
    fn defaults_match_conventional_layout() {
        let output = OutputPaths::default();
        assert_eq!(output.dir, "public");
        assert_eq!(output.scripts, "public/assets");

        let input = InputPaths::default();
        assert_eq!(input.main, "src/main.json");
        assert_eq!(input.templates, "src/templates");
    }
}
