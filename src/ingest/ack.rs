use super::error::{FailureKind, IngestError};
use super::publish::Artifact;
use serde::{Deserialize, Serialize};

/// Result of one submission, sent back to the submitting connection only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Acknowledgement {
    Saved {
        file_name: String,
        bytes: u64,
        duration_secs: f64,
        sample_rate: u32,
        channels: u16,
        /// False when the file was stored without probing (degraded mode)
        validated: bool,
    },
    Failed {
        kind: FailureKind,
        error: String,
    },
}

impl Acknowledgement {
    pub fn saved(artifact: &Artifact) -> Self {
        Self::Saved {
            file_name: artifact.file_name.clone(),
            bytes: artifact.metrics.bytes,
            duration_secs: artifact.metrics.duration_secs,
            sample_rate: artifact.metrics.sample_rate,
            channels: artifact.metrics.channels,
            validated: artifact.metrics.validated,
        }
    }

    pub fn failed(err: &IngestError) -> Self {
        Self::Failed {
            kind: err.kind(),
            error: err.to_string(),
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}
