pub mod engine;
pub mod ffmpeg;

pub use engine::{EngineReadiness, MediaEngine, ProbeReport, TranscodeProfile};
pub use ffmpeg::{FfmpegConfig, FfmpegEngine};
