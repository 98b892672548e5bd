//! Shared state for a running development server.
//!
//! Tracks connected Server-Sent Events clients and fans reload events out to
//! them. Uses parking_lot locks; no lock is held across an await.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::dev::DevEvent;
use crate::ui;

/// Per-client queue depth. A client this far behind misses events instead of
/// stalling the broadcaster.
const CLIENT_BUFFER: usize = 100;

/// Connected SSE clients by id.
pub type ClientRegistry = Arc<RwLock<HashMap<usize, mpsc::Sender<String>>>>;

pub struct DevServerState {
    pub clients: ClientRegistry,
    pub next_client_id: RwLock<usize>,
    /// Project root; reload paths are logged relative to it.
    pub root: PathBuf,
}

impl DevServerState {
    pub fn new(root: PathBuf) -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: RwLock::new(0),
            root,
        }
    }

    /// Register a new SSE client, returning its id and event receiver.
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.clients.write().insert(id, tx);

        (id, rx)
    }

    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Send an event to every connected client without waiting.
    ///
    /// Clients whose receiver is gone are pruned. Returns the number of
    /// clients the event was queued for.
    pub fn broadcast(&self, event: &DevEvent) -> usize {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to encode dev event: {e}");
                return 0;
            }
        };

        let clients = self.clients.read().clone();
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, tx) in clients {
            match tx.try_send(json.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!("client {id} is lagging, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id),
            }
        }

        for id in closed {
            self.unregister_client(id);
        }

        delivered
    }

    /// Ask every client for a full page reload and log it.
    ///
    /// `path` names what changed; absolute paths are shown relative to the
    /// project root and `None` is shown as `*`.
    pub fn full_reload(&self, path: Option<&str>) {
        let shown = match path {
            Some(p) => ui::relative_display(Path::new(p), &self.root),
            None => "*".to_string(),
        };

        self.broadcast(&DevEvent::FullReload {
            path: "*".to_string(),
        });
        tracing::info!("page reload {shown}");
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Drop every client sender, ending their event streams.
    pub fn disconnect_all(&self) {
        self.clients.write().clear();
    }
}

pub type SharedState = Arc<DevServerState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_assigns_distinct_ids() {
        let state = DevServerState::new(PathBuf::from("/site"));

        let (id1, _rx1) = state.register_client();
        let (id2, _rx2) = state.register_client();
        assert_ne!(id1, id2);
        assert_eq!(state.client_count(), 2);

        state.unregister_client(id1);
        assert_eq!(state.client_count(), 1);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_client() {
        let state = DevServerState::new(PathBuf::from("/site"));
        let (_, mut rx1) = state.register_client();
        let (_, mut rx2) = state.register_client();

        state.full_reload(Some("/site/public/assets/app.js"));

        let expected = r#"{"type":"full-reload","path":"*"}"#;
        assert_eq!(rx1.recv().await.as_deref(), Some(expected));
        assert_eq!(rx2.recv().await.as_deref(), Some(expected));
    }

    #[test]
    fn broadcast_prunes_closed_clients() {
        let state = DevServerState::new(PathBuf::from("/site"));
        let (_, rx) = state.register_client();
        let (_, _keep) = state.register_client();
        drop(rx);

        let delivered = state.broadcast(&DevEvent::Connected { id: 7 });
        assert_eq!(delivered, 1);
        assert_eq!(state.client_count(), 1);
    }

    #[test]
    fn full_reload_without_clients_is_harmless() {
        let state = DevServerState::new(PathBuf::from("/site"));
        state.full_reload(None);
        assert_eq!(state.client_count(), 0);
    }
}
