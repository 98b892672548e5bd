//! `styles:build`: process every top-level stylesheet with lightningcss.
//!
//! The `styles.postcss` list selects the transforms:
//!
//! - `import` inlines `@import` rules through the lightningcss bundler
//! - `nesting` always lowers nested rules
//! - `autoprefixer` adds vendor prefixes for `styles.targets`

use std::fs;
use std::path::{Path, PathBuf};

use lightningcss::{
    bundler::{Bundler, FileProvider},
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions, StyleSheet},
    targets::{Browsers, Features, Targets},
};
use weld_config::{SiteConfig, StylePlugin, StylesOptions};

use crate::error::{BuildError, Result};
use crate::steps::writer::{OutputFile, write_outputs};
use crate::steps::{list_sources, output_name, source_dir};

pub const STYLE_EXTENSIONS: &[&str] = &["css"];

/// Process `input.styles/*.css` into `output.styles/<name>.css`.
pub fn build_styles(config: &SiteConfig) -> Result<Vec<PathBuf>> {
    let Some(input) = source_dir(config, &config.input.styles) else {
        return Ok(Vec::new());
    };
    let sources = list_sources(&input, STYLE_EXTENSIONS)?;
    if sources.is_empty() {
        tracing::debug!("no stylesheets in {}", input.display());
        return Ok(Vec::new());
    }

    let targets = resolve_targets(&config.styles)?;
    let mut files = Vec::with_capacity(sources.len());
    for source in &sources {
        let css = process_stylesheet(source, &config.styles, targets)?;
        files.push(OutputFile::new(output_name(source, "css"), css));
    }

    Ok(write_outputs(&config.resolve(&config.output.styles), &files)?)
}

/// Browser targets implied by the configured plugins.
pub fn resolve_targets(options: &StylesOptions) -> Result<Targets> {
    let browsers = if options.uses(StylePlugin::Autoprefixer) {
        Browsers::from_browserslist(options.targets.iter().map(String::as_str)).map_err(|e| {
            BuildError::Styles {
                file: PathBuf::from("styles.targets"),
                error: e.to_string(),
            }
        })?
    } else {
        None
    };

    let include = if options.uses(StylePlugin::Nesting) {
        Features::Nesting
    } else {
        Features::empty()
    };

    Ok(Targets {
        browsers,
        include,
        ..Default::default()
    })
}

/// Process one stylesheet and return the resulting CSS.
pub fn process_stylesheet(path: &Path, options: &StylesOptions, targets: Targets) -> Result<String> {
    let styles_error = |error: String| BuildError::Styles {
        file: path.to_path_buf(),
        error,
    };

    let provider = FileProvider::new();
    let source;
    let mut stylesheet = if options.uses(StylePlugin::Import) {
        let mut bundler = Bundler::new(&provider, None, ParserOptions::default());
        bundler
            .bundle(path)
            .map_err(|e| styles_error(e.to_string()))?
    } else {
        source = fs::read_to_string(path)?;
        StyleSheet::parse(
            &source,
            ParserOptions {
                filename: path.to_string_lossy().into_owned(),
                ..Default::default()
            },
        )
        .map_err(|e| styles_error(e.to_string()))?
    };

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..Default::default()
        })
        .map_err(|e| styles_error(e.to_string()))?;

    let output = stylesheet
        .to_css(PrinterOptions {
            minify: options.minify,
            targets,
            ..Default::default()
        })
        .map_err(|e| styles_error(e.to_string()))?;

    Ok(output.code)
}
