use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,

    /// Peer address, or the first `X-Forwarded-For` hop when proxied
    pub remote_addr: Option<String>,

    /// When the connection was accepted
    pub connected_at: DateTime<Utc>,

    /// Seconds since the connection was accepted
    pub connected_secs: f64,

    /// False once the connection has closed
    pub alive: bool,

    /// Submissions received on this connection
    pub submissions: usize,

    /// Acknowledgements handed to the connection writer
    pub acks_delivered: usize,
}
