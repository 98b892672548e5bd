//! Clean URL rewriting for the development server.
//!
//! Maps `/about` to `/<output>/about.html` and `/index.html` to
//! `/<output>/index.html`, so rendered pages can be linked without their
//! extension while the server keeps serving the project root.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{Uri, uri::PathAndQuery},
    middleware::Next,
    response::Response,
};

/// Prefix of the server's own endpoints; never rewritten.
pub const INTERNAL_PREFIX: &str = "/__weld";

/// Translate a request path.
///
/// `original_url` is the path as received, `request_path` the path after
/// directory index resolution. Neither carries a query string.
///
/// ```
/// use weld_cli::dev::translate;
///
/// assert_eq!(translate("/about", "/about", "public"), "/public/about.html");
/// assert_eq!(translate("/index.html", "/", "public"), "/public/index.html");
/// assert_eq!(translate("/page.html", "/page.html", "public"), "/page.html");
/// ```
pub fn translate(request_path: &str, original_url: &str, output_dir: &str) -> String {
    if !original_url.ends_with(".html") && original_url != "/" {
        format!("/{output_dir}{original_url}.html")
    } else if request_path == "/index.html" {
        format!("/{output_dir}/index.html")
    } else {
        request_path.to_string()
    }
}

/// Resolve a directory request (`/`, `/docs/`) to its `index.html`.
pub fn resolve_index(path: &str) -> String {
    if path.ends_with('/') {
        format!("{path}index.html")
    } else {
        path.to_string()
    }
}

/// Where the rewrite middleware looks for files that already exist.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    root: PathBuf,
    public_dir: PathBuf,
    output_dir: String,
}

impl RewriteContext {
    pub fn new(root: &Path, output_dir: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            public_dir: root.join(output_dir),
            output_dir: output_dir.to_string(),
        }
    }

    /// Whether `url_path` names a file the static handler would serve.
    async fn serves_file(&self, url_path: &str) -> bool {
        let relative = Path::new(url_path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return false;
        }

        for base in [&self.public_dir, &self.root] {
            let meta = tokio::fs::metadata(base.join(relative)).await;
            if meta.is_ok_and(|meta| meta.is_file()) {
                return true;
            }
        }
        false
    }

    /// The path the request should be served from, if it changes.
    pub async fn rewrite(&self, original_url: &str) -> Option<String> {
        if original_url.starts_with(INTERNAL_PREFIX) {
            return None;
        }

        let request_path = resolve_index(original_url);
        if self.serves_file(&request_path).await {
            return None;
        }

        let translated = translate(&request_path, original_url, &self.output_dir);
        (translated != original_url).then_some(translated)
    }
}

/// Request middleware applying [`translate`] before routing. The query string
/// is carried over unchanged.
pub async fn clean_urls(
    State(ctx): State<Arc<RewriteContext>>,
    mut request: Request,
    next: Next,
) -> Response {
    let original = request.uri().path().to_string();

    if let Some(rewritten) = ctx.rewrite(&original).await {
        match with_path(request.uri(), &rewritten) {
            Some(uri) => {
                tracing::debug!("rewrite {original} -> {rewritten}");
                *request.uri_mut() = uri;
            }
            None => tracing::debug!("could not rewrite {original} to {rewritten}"),
        }
    }

    next.run(request).await
}

fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn clean_url_maps_to_output_page() {
        assert_eq!(translate("/about", "/about", "public"), "/public/about.html");
        assert_eq!(
            translate("/blog/post", "/blog/post", "public"),
            "/public/blog/post.html"
        );
    }

    #[test]
    fn root_maps_to_output_index() {
        assert_eq!(translate("/index.html", "/", "public"), "/public/index.html");
        assert_eq!(
            translate("/index.html", "/index.html", "public"),
            "/public/index.html"
        );
    }

    #[test]
    fn other_html_paths_are_untouched() {
        assert_eq!(translate("/page.html", "/page.html", "public"), "/page.html");
        assert_eq!(
            translate("/public/page.html", "/public/page.html", "public"),
            "/public/page.html"
        );
    }

    #[test]
    fn resolves_directory_index() {
        assert_eq!(resolve_index("/"), "/index.html");
        assert_eq!(resolve_index("/docs/"), "/docs/index.html");
        assert_eq!(resolve_index("/docs"), "/docs");
    }

    #[test]
    fn query_is_preserved() {
        let uri: Uri = "/about?lang=en".parse().unwrap();
        let rewritten = with_path(&uri, "/public/about.html").unwrap();
        assert_eq!(rewritten.path(), "/public/about.html");
        assert_eq!(rewritten.query(), Some("lang=en"));
    }

    #[tokio::test]
    async fn existing_files_are_not_rewritten() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("public/assets")).unwrap();
        fs::create_dir_all(dir.path().join("src/scripts")).unwrap();
        fs::write(dir.path().join("public/assets/app.js"), "").unwrap();
        fs::write(dir.path().join("src/scripts/main.js"), "").unwrap();
        fs::write(dir.path().join("public/index.html"), "").unwrap();

        let ctx = RewriteContext::new(dir.path(), "public");
        assert_eq!(ctx.rewrite("/assets/app.js").await, None);
        assert_eq!(ctx.rewrite("/src/scripts/main.js").await, None);
        assert_eq!(ctx.rewrite("/").await, None);
        assert_eq!(
            ctx.rewrite("/about").await.as_deref(),
            Some("/public/about.html")
        );
    }

    #[tokio::test]
    async fn internal_endpoints_are_skipped() {
        let dir = TempDir::new().unwrap();
        let ctx = RewriteContext::new(dir.path(), "public");
        assert_eq!(ctx.rewrite("/__weld_sse__").await, None);
    }

    #[tokio::test]
    async fn traversal_never_counts_as_existing() {
        let dir = TempDir::new().unwrap();
        let ctx = RewriteContext::new(dir.path(), "public");
        assert!(!ctx.serves_file("/../etc/passwd").await);
    }
}
