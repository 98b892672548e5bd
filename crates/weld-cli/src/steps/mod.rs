//! Build steps.
//!
//! Each step reads the top-level files of one input directory, transforms
//! them with its library and writes the results through [`writer`]. A step
//! whose input directory is missing warns and does nothing.

pub mod asset;
pub mod scripts;
pub mod styles;
pub mod templates;
pub mod writer;

pub use asset::AssetRewriter;
pub use scripts::build_scripts;
pub use styles::build_styles;
pub use templates::render_templates;

use std::fs;
use std::path::{Path, PathBuf};

use weld_config::SiteConfig;

use crate::error::{Result, ResultExt};
use crate::ui;

/// Resolve an input directory, warning when it does not exist.
pub(crate) fn source_dir(config: &SiteConfig, segment: &str) -> Option<PathBuf> {
    let dir = config.resolve(segment);
    if dir.is_dir() {
        Some(dir)
    } else {
        ui::warning(&format!("{segment} not found, skipping"));
        None
    }
}

/// Files directly inside `dir` with one of `extensions`, sorted by name.
pub fn list_sources(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for entry in fs::read_dir(dir).with_path(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extensions) {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// `src/templates/index.twig` -> `index.html` for `extension = "html"`.
pub(crate) fn output_name(source: &Path, extension: &str) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.{extension}")
}
