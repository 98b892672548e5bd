//! On-request source transforms for dev mode.
//!
//! Dev-mode pages reference sources directly (`/src/scripts/app.ts`,
//! `/src/styles/main.css`). Script entries are bundled with rolldown and
//! stylesheets processed with lightningcss each time they are requested, so a
//! reload always sees the current sources. Chunks, assets and source maps
//! produced alongside an entry are held in a [`ModuleCache`] until the next
//! bundle of that entry replaces them.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::RwLock;
use tokio::runtime::Handle;
use weld_config::SiteConfig;

use crate::error::{BuildError, Result};
use crate::steps::scripts::{self, SCRIPT_EXTENSIONS};
use crate::steps::styles::{self, STYLE_EXTENSIONS};
use crate::steps::has_extension;

/// A generated module ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub content: Vec<u8>,
    pub content_type: &'static str,
}

impl Module {
    fn new(name: &str, content: Vec<u8>) -> Self {
        Self {
            content,
            content_type: content_type(name),
        }
    }
}

impl IntoResponse for Module {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, self.content_type),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            self.content,
        )
            .into_response()
    }
}

/// Generated modules by URL path.
#[derive(Debug, Default)]
pub struct ModuleCache {
    files: RwLock<HashMap<String, Module>>,
}

impl ModuleCache {
    pub fn insert(&self, url_path: String, module: Module) {
        self.files.write().insert(url_path, module);
    }

    pub fn get(&self, url_path: &str) -> Option<Module> {
        self.files.read().get(url_path).cloned()
    }
}

/// Serves script and style sources as the browser needs them.
pub struct SourceTransformer {
    config: Arc<SiteConfig>,
    scripts_prefix: String,
    styles_prefix: String,
    cache: ModuleCache,
}

impl SourceTransformer {
    pub fn new(config: Arc<SiteConfig>) -> Self {
        Self {
            scripts_prefix: format!("/{}/", config.input.scripts),
            styles_prefix: format!("/{}/", config.input.styles),
            config,
            cache: ModuleCache::default(),
        }
    }

    /// The module for `url_path`, or `None` when it is not a transformed
    /// source and the static files should answer.
    pub async fn transform(&self, url_path: &str) -> Result<Option<Module>> {
        let is_script = url_path.starts_with(&self.scripts_prefix);
        let is_style = url_path.starts_with(&self.styles_prefix);
        if !is_script && !is_style {
            return Ok(None);
        }

        let Some(source) = self.source_file(url_path) else {
            return Ok(self.cache.get(url_path));
        };

        if is_script && has_extension(&source, SCRIPT_EXTENSIONS) {
            self.bundle_entry(url_path, source).await.map(Some)
        } else if is_style && has_extension(&source, STYLE_EXTENSIONS) {
            self.process_style(source).await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Existing file under the project root named by `url_path`.
    fn source_file(&self, url_path: &str) -> Option<PathBuf> {
        let relative = Path::new(url_path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        let path = self.config.root.join(relative);
        path.is_file().then_some(path)
    }

    async fn bundle_entry(&self, url_path: &str, source: PathBuf) -> Result<Module> {
        let config = Arc::clone(&self.config);
        let entries = vec![source.clone()];
        let handle = Handle::current();
        let files = tokio::task::spawn_blocking(move || {
            handle.block_on(scripts::bundle(&config, &entries))
        })
        .await
        .map_err(|e| BuildError::Scripts(format!("bundler task failed: {e}")))??;

        let entry_name = format!("{}.js", stem(&source));
        let base = url_dir(url_path);
        let mut entry = None;
        for file in files {
            let module = Module::new(&file.name, file.contents);
            if file.name == entry_name {
                entry = Some(module);
            } else {
                self.cache.insert(format!("{base}{}", file.name), module);
            }
        }

        entry.ok_or_else(|| {
            BuildError::Scripts(format!("no output for {}", source.display())).into()
        })
    }

    async fn process_style(&self, source: PathBuf) -> Result<Module> {
        let options = self.config.styles.clone();
        let file = source.clone();
        let css = tokio::task::spawn_blocking(move || {
            let targets = styles::resolve_targets(&options)?;
            styles::process_stylesheet(&source, &options, targets)
        })
        .await
        .map_err(|e| BuildError::Styles {
            file,
            error: format!("stylesheet task failed: {e}"),
        })??;

        Ok(Module {
            content: css.into_bytes(),
            content_type: "text/css",
        })
    }
}

/// Request middleware answering source requests with their transformed
/// module. Everything else continues to the router.
pub async fn transform_sources(
    State(transformer): State<Arc<SourceTransformer>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match transformer.transform(&path).await {
        Ok(Some(module)) => {
            tracing::debug!("transformed {path}");
            module.into_response()
        }
        Ok(None) => next.run(request).await,
        Err(e) => {
            tracing::error!("{path}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
                .into_response()
        }
    }
}

fn content_type(name: &str) -> &'static str {
    match name.rsplit('.').next() {
        Some("js" | "mjs") => "application/javascript",
        Some("css") => "text/css",
        Some("map" | "json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `/src/scripts/app.ts` -> `/src/scripts/`.
fn url_dir(url_path: &str) -> &str {
    match url_path.rfind('/') {
        Some(pos) => &url_path[..=pos],
        None => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use weld_config::Mode;

    fn transformer(root: &Path) -> SourceTransformer {
        let mut config = SiteConfig::defaults(root).with_mode(Mode::Dev);
        config.scripts.minify = false;
        SourceTransformer::new(Arc::new(config))
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type("app.js"), "application/javascript");
        assert_eq!(content_type("app.js.map"), "application/json");
        assert_eq!(content_type("main.css"), "text/css");
        assert_eq!(content_type("logo.svg"), "application/octet-stream");
    }

    #[test]
    fn url_dir_keeps_trailing_slash() {
        assert_eq!(url_dir("/src/scripts/app.ts"), "/src/scripts/");
        assert_eq!(url_dir("/src/scripts/lib/a.ts"), "/src/scripts/lib/");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn typescript_entry_is_bundled() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("src/scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("util.ts"), "export const n: number = 41;\n").unwrap();
        fs::write(
            scripts.join("app.ts"),
            "import { n } from './util.ts';\nconsole.log(n + 1);\n",
        )
        .unwrap();

        let module = transformer(dir.path())
            .transform("/src/scripts/app.ts")
            .await
            .unwrap()
            .unwrap();

        let code = String::from_utf8(module.content).unwrap();
        assert_eq!(module.content_type, "application/javascript");
        assert!(code.contains("41"));
        assert!(!code.contains(": number"));
        assert!(!code.contains("import {"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stylesheet_is_processed() {
        let dir = tempfile::tempdir().unwrap();
        let styles = dir.path().join("src/styles");
        fs::create_dir_all(&styles).unwrap();
        fs::write(styles.join("main.css"), "body {\n  color: #ff0000;\n}\n").unwrap();

        let module = transformer(dir.path())
            .transform("/src/styles/main.css")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(module.content_type, "text/css");
        assert_eq!(module.content, b"body{color:red}");
    }

    #[tokio::test]
    async fn other_paths_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let styles = dir.path().join("src/styles");
        fs::create_dir_all(&styles).unwrap();
        fs::write(styles.join("logo.svg"), "<svg/>").unwrap();
        let transformer = transformer(dir.path());

        assert!(transformer.transform("/about").await.unwrap().is_none());
        assert!(transformer.transform("/src/styles/logo.svg").await.unwrap().is_none());
        assert!(transformer.transform("/src/scripts/missing.js").await.unwrap().is_none());
        assert!(transformer.transform("/src/scripts/../../etc/passwd").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn broken_script_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("src/scripts");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("app.js"), "export const = ;\n").unwrap();

        let result = transformer(dir.path()).transform("/src/scripts/app.js").await;
        assert!(result.is_err());
    }

    #[test]
    fn cache_serves_inserted_modules() {
        let cache = ModuleCache::default();
        cache.insert(
            "/src/scripts/chunk.js".into(),
            Module::new("chunk.js", b"export {}".to_vec()),
        );
        assert_eq!(
            cache.get("/src/scripts/chunk.js").map(|m| m.content_type),
            Some("application/javascript")
        );
        assert!(cache.get("/src/scripts/other.js").is_none());
    }
}
