//! Per-connection session tracking
//!
//! A `Session` exists exactly as long as its WebSocket connection. It only
//! carries bookkeeping; submissions never read or write another session's state.

mod session;
mod stats;

pub use session::Session;
pub use stats::SessionInfo;
