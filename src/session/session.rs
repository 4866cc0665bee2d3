use super::stats::SessionInfo;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One connected client
pub struct Session {
    /// Opaque connection identifier
    id: String,

    /// When the connection was accepted
    connected_at: DateTime<Utc>,

    /// Where the client connected from
    remote_addr: Option<String>,

    /// Whether the connection is still open
    alive: AtomicBool,

    /// Number of submissions received
    submissions: AtomicUsize,

    /// Number of acknowledgements queued for delivery
    acks_delivered: AtomicUsize,
}

impl Session {
    pub fn new(remote_addr: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            connected_at: Utc::now(),
            remote_addr,
            alive: AtomicBool::new(true),
            submissions: AtomicUsize::new(0),
            acks_delivered: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection closed; in-flight runs keep going
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Count a submission, returning its 1-based number on this session
    pub fn record_submission(&self) -> usize {
        self.submissions.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn record_ack_delivered(&self) {
        self.acks_delivered.fetch_add(1, Ordering::SeqCst);
    }

    pub fn info(&self) -> SessionInfo {
        let connected = Utc::now().signed_duration_since(self.connected_at);

        SessionInfo {
            session_id: self.id.clone(),
            remote_addr: self.remote_addr.clone(),
            connected_at: self.connected_at,
            connected_secs: connected.num_milliseconds() as f64 / 1000.0,
            alive: self.is_alive(),
            submissions: self.submissions.load(Ordering::SeqCst),
            acks_delivered: self.acks_delivered.load(Ordering::SeqCst),
        }
    }
}
