//! `scripts:build`: bundle every top-level script entry with rolldown.

use std::path::{Path, PathBuf};

use rolldown::{
    BundleOutput, BundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform,
    RawMinifyOptions, SourceMapType,
};
use rolldown_common::Output;
use weld_config::SiteConfig;

use crate::error::{BuildError, Result};
use crate::steps::writer::{OutputFile, write_outputs};
use crate::steps::{list_sources, source_dir};

pub const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "ts", "tsx", "jsx"];

/// Bundle `input.scripts/*` into `output.scripts`.
///
/// Returns the written files; empty when the source directory is missing or
/// holds no entries.
pub async fn build_scripts(config: &SiteConfig) -> Result<Vec<PathBuf>> {
    let Some(input) = source_dir(config, &config.input.scripts) else {
        return Ok(Vec::new());
    };
    let entries = list_sources(&input, SCRIPT_EXTENSIONS)?;
    if entries.is_empty() {
        tracing::debug!("no script entries in {}", input.display());
        return Ok(Vec::new());
    }

    let files = bundle(config, &entries).await?;
    let written = write_outputs(&config.resolve(&config.output.scripts), &files)?;
    tracing::debug!("bundled {} script entries", entries.len());
    Ok(written)
}

/// Bundle `entries` in memory. Chunk and asset names are relative to the
/// directory the entries are served from.
pub async fn bundle(config: &SiteConfig, entries: &[PathBuf]) -> Result<Vec<OutputFile>> {
    let options = bundler_options(config, entries);
    let mut bundler = BundlerBuilder::default()
        .with_options(options)
        .build()
        .map_err(|e| BuildError::Scripts(format!("{e:?}")))?;
    let output = bundler
        .generate()
        .await
        .map_err(|e| BuildError::Scripts(format!("{e:?}")))?;

    Ok(bundle_files(&output))
}

fn bundler_options(config: &SiteConfig, entries: &[PathBuf]) -> BundlerOptions {
    let input = entries
        .iter()
        .map(|entry| InputItem {
            name: entry_name(entry),
            import: entry.to_string_lossy().into_owned(),
        })
        .collect();

    BundlerOptions {
        input: Some(input),
        cwd: Some(config.root.clone()),
        format: Some(OutputFormat::Esm),
        platform: Some(Platform::Browser),
        minify: Some(RawMinifyOptions::from(config.scripts.minify)),
        sourcemap: config.scripts.sourcemap.then_some(SourceMapType::File),
        ..Default::default()
    }
}

/// `src/scripts/app.ts` bundles to `app.js`.
fn entry_name(entry: &Path) -> Option<String> {
    entry
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

fn bundle_files(bundle: &BundleOutput) -> Vec<OutputFile> {
    bundle
        .assets
        .iter()
        .filter_map(|output| {
            if let Output::Chunk(chunk) = output {
                Some(OutputFile::new(chunk.filename.as_str(), chunk.code.as_bytes()))
            } else if let Output::Asset(asset) = output {
                Some(OutputFile::new(asset.filename.as_str(), asset.source.as_bytes()))
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn entry_names_drop_extension() {
        assert_eq!(entry_name(Path::new("/site/src/scripts/app.ts")).as_deref(), Some("app"));
        assert_eq!(entry_name(Path::new("main.mjs")).as_deref(), Some("main"));
    }

    #[test]
    fn options_follow_config() {
        let mut config = SiteConfig::defaults("/site");
        config.scripts.minify = false;
        config.scripts.sourcemap = true;

        let options = bundler_options(&config, &[PathBuf::from("/site/src/scripts/app.js")]);
        assert!(matches!(options.format, Some(OutputFormat::Esm)));
        assert!(matches!(options.sourcemap, Some(SourceMapType::File)));
        assert_eq!(options.cwd, Some(PathBuf::from("/site")));
        assert_eq!(options.input.map(|i| i.len()), Some(1));
    }

    #[tokio::test]
    async fn missing_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = SiteConfig::defaults(dir.path());
        assert!(build_scripts(&config).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bundles_entry_into_output() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("src/scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("util.js"), "export const greet = (n) => `hi ${n}`;\n").unwrap();
        fs::write(
            scripts.join("app.js"),
            "import { greet } from './util.js';\nconsole.log(greet('weld'));\n",
        )
        .unwrap();

        let config = SiteConfig::defaults(dir.path());
        let written = build_scripts(&config).await.unwrap();

        assert!(!written.is_empty());
        assert!(dir.path().join("public/assets/app.js").exists());
    }
}
