use crate::ingest::IngestError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which halves of the encoding engine were found at startup
///
/// Detected once and never re-probed; a missing engine stays missing until
/// the process is restarted with a fixed configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineReadiness {
    /// Encoder available (`ffmpeg`)
    pub encoder: bool,
    /// Inspection companion available (`ffprobe`)
    pub probe: bool,
}

impl EngineReadiness {
    pub fn ready() -> Self {
        Self {
            encoder: true,
            probe: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            encoder: false,
            probe: false,
        }
    }
}

/// Target encoding for every artifact
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeProfile {
    /// Encoder name passed to `-codec:a`
    pub codec: String,
    /// Constant bitrate in kbps
    pub bitrate_kbps: u32,
    /// Output channel count (1 = mono downmix)
    pub channels: u16,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Container format passed to `-f`
    pub format: String,
    /// File extension of published artifacts
    pub extension: String,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            codec: "libmp3lame".to_string(),
            bitrate_kbps: 192,
            channels: 1,
            sample_rate: 44100,
            format: "mp3".to_string(),
            extension: "mp3".to_string(),
        }
    }
}

/// What the inspection mode reports about a file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbeReport {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// External encoding engine
///
/// Implementations:
/// - `FfmpegEngine`: shells out to ffmpeg/ffprobe
/// - test doubles that script success or failure without a real encoder
#[async_trait::async_trait]
pub trait MediaEngine: Send + Sync {
    /// Readiness captured at construction time
    fn readiness(&self) -> EngineReadiness;

    /// Convert `source` into `target` using `profile`
    ///
    /// Fails with `TranscodeUnavailable` when the encoder is not ready and
    /// `TranscodeFailed` when the engine rejects the input.
    async fn transcode(
        &self,
        source: &Path,
        target: &Path,
        profile: &TranscodeProfile,
    ) -> Result<(), IngestError>;

    /// Inspect duration, channels and sample rate of `path`
    async fn probe(&self, path: &Path) -> Result<ProbeReport>;

    /// Engine name for logging
    fn name(&self) -> &str;
}
