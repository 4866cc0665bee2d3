//! HTTP and WebSocket API for browser recorders
//!
//! - GET /ws - Submission socket (`client:audio` in, `server:save_ack` out)
//! - GET /sessions - Connected clients
//! - GET /health - Health check with transcoder readiness

mod handlers;
mod routes;
mod socket;
mod state;

pub use handlers::HealthResponse;
pub use routes::create_router;
pub use state::{AppState, DEFAULT_MAX_MESSAGE_BYTES};
