//! Development server with live reload via Server-Sent Events.
//!
//! [`DevServer::init`] binds the listener, starts the file watch and returns a
//! [`DevSession`]. [`LiveReload`] is a cloneable handle that owns at most one
//! session, so build steps can trigger reloads without knowing whether a
//! server is running.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tower_http::services::ServeDir;
use weld_config::SiteConfig;

use crate::dev::reload::{self, ReloadGate, ReloadPredicate};
use crate::dev::rewrite::{RewriteContext, clean_urls};
use crate::dev::transform::{SourceTransformer, transform_sources};
use crate::dev::{DevEvent, DevServerState, FileWatcher, SharedState};
use crate::error::{CliError, Result};
use crate::ui;

pub const SSE_PATH: &str = "/__weld_sse__";
pub const RELOAD_SCRIPT_PATH: &str = "/__weld_reload__.js";

const RELOAD_SCRIPT: &str = include_str!("../../assets/reload-client.js");
const RELOAD_TAG: &str = r#"<script src="/__weld_reload__.js"></script>"#;
/// Dependencies, VCS data and the output writer's staging files.
const ALWAYS_IGNORED: [&str; 3] = ["**/node_modules/**", "**/.git/**", "**/*.tmp"];
const MAX_HTML_BYTES: usize = 16 * 1024 * 1024;

/// Options for one server session.
///
/// `Default` holds the adapter defaults; callers override fields with struct
/// update syntax.
#[derive(Clone)]
pub struct DevServerOptions {
    pub root: PathBuf,
    /// Directory under `root` served at `/` and targeted by clean URLs.
    pub output: String,
    pub host: String,
    /// `0` binds an ephemeral port.
    pub port: u16,
    pub open: bool,
    /// Extra globs excluded from the watch, relative to `root`.
    pub ignored: Vec<String>,
    pub reload_public: bool,
    pub extra_reload: ReloadPredicate,
    /// Transforms for source requests; set for dev mode.
    pub sources: Option<Arc<SourceTransformer>>,
}

impl Default for DevServerOptions {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            output: "public".into(),
            host: "0.0.0.0".into(),
            port: 3000,
            open: false,
            ignored: Vec::new(),
            reload_public: true,
            extra_reload: reload::never(),
            sources: None,
        }
    }
}

impl DevServerOptions {
    /// Options for the pipeline's server.
    ///
    /// Template sources are never watched here; the watch step re-renders
    /// them and reloads after rendering. In dev mode the server transforms
    /// script and style sources itself and reloads when they change.
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        let mut ignored = config.serve.ignored.clone();
        ignored.push(format!("**/{}/**", config.input.templates));

        let mut reload_files = config.serve.reload_files.clone();
        let sources = if config.mode().is_dev() {
            reload_files.push(format!("{}/**", config.input.scripts));
            reload_files.push(format!("{}/**", config.input.styles));
            Some(Arc::new(SourceTransformer::new(Arc::new(config.clone()))))
        } else {
            None
        };

        Ok(Self {
            root: config.root.clone(),
            output: config.output.templates.clone(),
            host: config.serve.host.clone(),
            port: config.serve.port,
            open: config.serve.open,
            ignored,
            reload_public: config.serve.reload_public,
            extra_reload: reload::glob_predicate(&reload_files)?,
            sources,
        })
    }

    /// Everything excluded from the watch.
    pub fn watch_ignores(&self) -> Vec<String> {
        let mut globs = self.ignored.clone();
        globs.extend(ALWAYS_IGNORED.iter().map(|glob| glob.to_string()));
        if !self.reload_public {
            globs.push(format!("**/{}/*.html", self.output));
        }
        globs
    }

    pub fn gate(&self) -> ReloadGate {
        ReloadGate::new(&self.output, self.reload_public).with_predicate(self.extra_reload.clone())
    }
}

/// Development server, before it is started.
pub struct DevServer {
    options: DevServerOptions,
    state: SharedState,
}

impl DevServer {
    pub fn new(options: DevServerOptions) -> Self {
        let state = Arc::new(DevServerState::new(options.root.clone()));
        Self { options, state }
    }

    /// Start a server with `options`.
    pub async fn init(options: DevServerOptions) -> Result<DevSession> {
        Self::new(options).start().await
    }

    /// Build the router.
    ///
    /// In dev mode source requests are answered by the transformer first.
    /// Other requests pass the clean URL rewrite, then routing: the SSE
    /// endpoint, the reload client script, and static files from the output
    /// directory falling back to the project root. HTML responses get the
    /// reload client injected.
    pub fn router(&self) -> Router {
        let public_dir = self.options.root.join(&self.options.output);
        let files = ServeDir::new(public_dir).fallback(ServeDir::new(&self.options.root));

        let pages = Router::new()
            .route(SSE_PATH, get(handle_sse))
            .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
            .fallback_service(files)
            .layer(middleware::from_fn(inject_reload_client))
            .with_state(self.state.clone());

        let rewrite = Arc::new(RewriteContext::new(&self.options.root, &self.options.output));

        // The rewrite must run before `pages` routes, so it wraps it.
        let router = Router::new()
            .fallback_service(pages)
            .layer(middleware::from_fn_with_state(rewrite, clean_urls));

        // Generated chunks have no file on disk; the rewrite would claim them.
        match &self.options.sources {
            Some(sources) => router.layer(middleware::from_fn_with_state(
                Arc::clone(sources),
                transform_sources,
            )),
            None => router,
        }
    }

    /// Bind, start serving and start watching.
    ///
    /// # Errors
    ///
    /// [`CliError::Server`] when the address cannot be bound. There is no
    /// retry on another port.
    pub async fn start(self) -> Result<DevSession> {
        let host = self.options.host.clone();
        let port = self.options.port;

        let listener = TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {host}:{port}: {e}")))?;
        let addr = listener.local_addr()?;

        let (watcher, mut changes) =
            FileWatcher::new(self.options.root.clone(), &self.options.watch_ignores())?;

        let router = self.router();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let gate = self.options.gate();
        let state = self.state.clone();
        let watch_root = watcher.root().to_path_buf();
        let watch = tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                let relative = ui::relative_display(change.path(), &watch_root);
                if gate.should_reload(&relative) {
                    state.full_reload(Some(&relative));
                } else {
                    tracing::debug!("no reload for {relative}");
                }
            }
        });

        let url = server_url(&host, addr);
        ui::success(&format!("Development server running at {url}"));
        if self.options.open {
            open_browser(&url);
        }

        Ok(DevSession {
            addr,
            state: self.state,
            shutdown: Some(shutdown_tx),
            server: Some(server),
            watch,
            _watcher: watcher,
        })
    }
}

/// A running server. Dropping it stops the server without waiting.
pub struct DevSession {
    addr: SocketAddr,
    state: SharedState,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<std::io::Result<()>>>,
    watch: JoinHandle<()>,
    _watcher: FileWatcher,
}

impl DevSession {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Broadcast a full reload to every connected browser.
    pub fn reload(&self, path: Option<&str>) {
        self.state.full_reload(path);
    }

    /// Stop the watch and shut the server down gracefully.
    pub async fn shutdown(mut self) -> Result<()> {
        self.signal_shutdown();

        let Some(server) = self.server.take() else {
            return Ok(());
        };
        match server.await {
            Ok(Ok(())) => {
                tracing::debug!("dev server on {} stopped", self.addr);
                Ok(())
            }
            Ok(Err(e)) => Err(CliError::Server(format!("server stopped with error: {e}"))),
            Err(e) => Err(CliError::Server(format!("server task failed: {e}"))),
        }
    }

    fn signal_shutdown(&mut self) {
        self.watch.abort();
        // Open event streams would otherwise hold the graceful shutdown.
        self.state.disconnect_all();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for DevSession {
    fn drop(&mut self) {
        self.signal_shutdown();
    }
}

/// Cloneable handle to the current session, if any.
///
/// Starting a session on a handle that already has one closes the old session
/// first. Reloading without a session does nothing.
#[derive(Clone, Default)]
pub struct LiveReload {
    session: Arc<Mutex<Option<DevSession>>>,
}

impl LiveReload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a server and attach it to this handle.
    pub async fn init(&self, options: DevServerOptions) -> Result<SocketAddr> {
        let previous = self.session.lock().take();
        if let Some(previous) = previous {
            tracing::debug!("replacing dev server on {}", previous.addr());
            if let Err(e) = previous.shutdown().await {
                tracing::warn!("previous dev server did not stop cleanly: {e}");
            }
        }

        let session = DevServer::init(options).await?;
        let addr = session.addr();
        *self.session.lock() = Some(session);
        Ok(addr)
    }

    pub fn reload(&self, path: Option<&str>) {
        if let Some(session) = self.session.lock().as_ref() {
            session.reload(path);
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().is_some()
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.session.lock().as_ref().map(DevSession::addr)
    }

    pub async fn shutdown(&self) -> Result<()> {
        let session = self.session.lock().take();
        match session {
            Some(session) => session.shutdown().await,
            None => Ok(()),
        }
    }
}

async fn handle_sse(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (id, rx) = state.register_client();
    tracing::debug!("client {id} connected ({} open)", state.client_count());

    state.broadcast(&DevEvent::Connected { id });

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn handle_reload_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_SCRIPT,
    )
}

/// Response middleware adding the reload client to successful HTML responses.
async fn inject_reload_client(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html"));
    if response.status() != StatusCode::OK || !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_HTML_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("could not buffer HTML response: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(inject_reload_script(&bytes)))
}

/// Insert the reload script tag before `</body>`, or append it.
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + RELOAD_TAG.len() + 4);
        result.push_str(&html[..pos]);
        result.push_str(RELOAD_TAG);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result.into_bytes();
    }

    let mut result = html.into_owned();
    result.push('\n');
    result.push_str(RELOAD_TAG);
    result.into_bytes()
}

fn server_url(host: &str, addr: SocketAddr) -> String {
    let shown = match host {
        "0.0.0.0" | "::" | "" => "localhost",
        other => other,
    };
    format!("http://{shown}:{}/", addr.port())
}

/// Open `url` in the default browser.
fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    match result {
        Ok(_) => ui::info(&format!("Opened browser at {url}")),
        Err(e) => ui::warning(&format!("Failed to open browser: {e}")),
    }
}
