use crate::ingest::IngestPipeline;
use crate::session::Session;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default cap on a single WebSocket message (~100 MB)
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 100 * 1024 * 1024;

/// Shared application state for HTTP and WebSocket handlers
#[derive(Clone)]
pub struct AppState {
    /// Live sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,

    /// Number of open connections; only the connection handler changes it
    pub live_connections: Arc<AtomicUsize>,

    /// Ingestion pipeline shared by every connection
    pub pipeline: Arc<IngestPipeline>,

    /// Largest WebSocket message accepted from a client
    pub max_message_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<IngestPipeline>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            live_connections: Arc::new(AtomicUsize::new(0)),
            pipeline,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    pub fn with_max_message_bytes(mut self, max_message_bytes: usize) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }

    /// Track a new session, returning the live connection count
    pub async fn register(&self, session: Arc<Session>) -> usize {
        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session.id().to_string(), session);
        }
        self.live_connections.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Forget a session, returning the live connection count
    pub async fn unregister(&self, session_id: &str) -> usize {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)
        };

        match removed {
            Some(_) => self.live_connections.fetch_sub(1, Ordering::SeqCst) - 1,
            None => self.live_connections.load(Ordering::SeqCst),
        }
    }

    pub fn live_connections(&self) -> usize {
        self.live_connections.load(Ordering::SeqCst)
    }
}
