//! Development server options.

use serde::{Deserialize, Serialize};

/// How assets are served while developing.
///
/// In [`Mode::Dev`] sources are served straight from the input directory and
/// only templates are rendered. In [`Mode::Build`] everything is built into
/// the output directory first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Dev,
    #[default]
    Build,
}

impl Mode {
    pub fn is_dev(self) -> bool {
        matches!(self, Mode::Dev)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Dev => write!(f, "dev"),
            Mode::Build => write!(f, "build"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeOptions {
    pub mode: Mode,

    pub host: String,

    /// `0` binds an ephemeral port.
    pub port: u16,

    /// Open the browser once the server listens.
    pub open: bool,

    /// Reload on every change under the output directory, including rendered
    /// `.html` and `.json` files.
    pub reload_public: bool,

    /// Extra globs excluded from the server's file watch.
    pub ignored: Vec<String>,

    /// Globs that always trigger a full reload.
    pub reload_files: Vec<String>,

    /// Re-render templates after a style rebuild in `watch:build`.
    pub render_after_styles: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            host: "0.0.0.0".into(),
            port: 3000,
            open: true,
            reload_public: false,
            ignored: Vec::new(),
            reload_files: Vec::new(),
            render_after_styles: false,
        }
    }
}
