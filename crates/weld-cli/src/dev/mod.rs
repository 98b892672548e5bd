//! Development server with live reload.
//!
//! - static files from the output directory, then the project root
//! - clean URL rewriting (`/about` serves `/<output>/about.html`)
//! - a file watch whose changes pass through [`ReloadGate`]
//! - reload events pushed to browsers over Server-Sent Events
//! - in dev mode, scripts and stylesheets transformed on request

pub mod reload;
pub mod rewrite;
pub mod server;
pub mod state;
pub mod transform;
pub mod watcher;

pub use reload::{ReloadGate, ReloadPredicate};
pub use rewrite::translate;
pub use server::{DevServer, DevServerOptions, DevSession, LiveReload};
pub use state::{DevServerState, SharedState};
pub use transform::SourceTransformer;
pub use watcher::{FileChange, FileWatcher};

use serde::{Deserialize, Serialize};

/// Messages sent to browsers on the SSE channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DevEvent {
    /// Reload the whole page. `path` is always `*`.
    FullReload { path: String },

    Connected { id: usize },
}
