pub mod config;
pub mod http;
pub mod ingest;
pub mod protocol;
pub mod session;
pub mod transcode;

pub use config::{Config, ConfigOverrides};
pub use http::{create_router, AppState};
pub use ingest::{Acknowledgement, FailureKind, IngestError, IngestPipeline, RawSubmission};
pub use protocol::{ClientMessage, ServerEvent};
pub use session::{Session, SessionInfo};
pub use transcode::{EngineReadiness, FfmpegConfig, FfmpegEngine, MediaEngine};
