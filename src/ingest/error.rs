use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a produced file was rejected after transcoding
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactDefect {
    /// File has zero bytes
    Empty,
    /// Probed duration below the configured minimum
    TooShort { duration_secs: f64, min_secs: f64 },
    /// No audio channels detected
    NoChannels { channels: u16 },
    /// The probe itself failed or timed out
    Unprobeable(String),
}

impl fmt::Display for ArtifactDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "output size is 0 bytes"),
            Self::TooShort {
                duration_secs,
                min_secs,
            } => write!(
                f,
                "invalid duration {:.3}s (minimum {:.1}s)",
                duration_secs, min_secs
            ),
            Self::NoChannels { channels } => {
                write!(f, "no audio channels detected (channels={})", channels)
            }
            Self::Unprobeable(reason) => write!(f, "could not probe output: {}", reason),
        }
    }
}

/// Failures of a single ingestion run
///
/// Every variant is caught at the run boundary and reported to the client
/// as a failed acknowledgement; none of them tear down the connection.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("failed to stage upload ({context}): {source}")]
    StageWrite {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("transcoder unavailable: {0}")]
    TranscodeUnavailable(String),

    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("invalid artifact: {0}")]
    InvalidArtifact(ArtifactDefect),

    #[error("failed to publish artifact ({context}): {source}")]
    Publish {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload(reason.into())
    }

    pub fn stage_write(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::StageWrite { context, source }
    }

    pub fn publish(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Publish { context, source }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidPayload(_) => FailureKind::InvalidPayload,
            Self::StageWrite { .. } => FailureKind::StageWriteError,
            Self::TranscodeUnavailable(_) => FailureKind::TranscodeUnavailable,
            Self::TranscodeFailed(_) => FailureKind::TranscodeFailed,
            Self::InvalidArtifact(_) => FailureKind::InvalidArtifact,
            Self::Publish { .. } => FailureKind::PublishError,
        }
    }
}

/// Wire-level category of a failed submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidPayload,
    StageWriteError,
    TranscodeUnavailable,
    TranscodeFailed,
    InvalidArtifact,
    PublishError,
}
