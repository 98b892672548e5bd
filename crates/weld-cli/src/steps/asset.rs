//! Asset reference rewriting for rendered templates.
//!
//! Templates reference sources by their input location
//! (`{{ "/src/styles/main.css" | asset }}`). In dev mode the server serves the
//! input directory as is, so the reference is kept. In build mode it is mapped
//! to the built location, and the output directory prefix is dropped because
//! the output directory is served at `/`.

use weld_config::{Mode, SiteConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRewriter {
    mode: Mode,
    input_dir: String,
    input_styles: String,
    input_scripts: String,
    output_dir: String,
    output_styles: String,
    output_scripts: String,
}

impl AssetRewriter {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            mode: config.mode(),
            input_dir: slash(&config.input.dir),
            input_styles: slash(&config.input.styles),
            input_scripts: slash(&config.input.scripts),
            output_dir: slash(&config.output.dir),
            output_styles: slash(&config.output.styles),
            output_scripts: slash(&config.output.scripts),
        }
    }

    /// Rewrite one asset URL in a single pass.
    pub fn rewrite(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }

        let from_input = has_segment_prefix(url, &self.input_dir);
        if from_input && self.mode.is_dev() {
            return url.to_string();
        }

        let mut url = url.to_string();
        if from_input {
            url = replace_prefix(&url, &self.input_styles, &self.output_styles);
            url = replace_prefix(&url, &self.input_scripts, &self.output_scripts);
        }

        if has_segment_prefix(&url, &self.output_dir) {
            url = url[self.output_dir.len()..].to_string();
            if url.is_empty() {
                url.push('/');
            }
        }
        url
    }
}

fn slash(segment: &str) -> String {
    format!("/{segment}")
}

/// `url` starts with `prefix` followed by `/`, `?`, `#` or the end.
fn has_segment_prefix(url: &str, prefix: &str) -> bool {
    match url.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

fn replace_prefix(url: &str, from: &str, to: &str) -> String {
    if has_segment_prefix(url, from) {
        format!("{to}{}", &url[from.len()..])
    } else {
        url.to_string()
    }
}
