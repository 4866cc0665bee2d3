use super::error::{ArtifactDefect, IngestError};
use crate::transcode::MediaEngine;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Measured properties of a produced file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtifactMetrics {
    pub bytes: u64,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// False when the probe was unavailable and only the size was checked
    pub validated: bool,
}

/// Plausibility thresholds for a produced file
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationPolicy {
    pub min_duration_secs: f64,
    pub min_channels: u16,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_duration_secs: 0.2,
            min_channels: 1,
        }
    }
}

impl ValidationPolicy {
    /// Apply the thresholds; unprobed metrics only need a nonzero size
    pub fn check(&self, metrics: &ArtifactMetrics) -> Result<(), ArtifactDefect> {
        if metrics.bytes == 0 {
            return Err(ArtifactDefect::Empty);
        }

        if !metrics.validated {
            return Ok(());
        }

        if metrics.duration_secs < self.min_duration_secs {
            return Err(ArtifactDefect::TooShort {
                duration_secs: metrics.duration_secs,
                min_secs: self.min_duration_secs,
            });
        }

        if metrics.channels < self.min_channels {
            return Err(ArtifactDefect::NoChannels {
                channels: metrics.channels,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validator {
    policy: ValidationPolicy,
}

impl Validator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    /// Measure `path` and reject implausible output
    ///
    /// The caller owns `path` and must delete it when this fails.
    pub async fn validate(
        &self,
        engine: &dyn MediaEngine,
        path: &Path,
    ) -> Result<ArtifactMetrics, IngestError> {
        let bytes = tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        let mut metrics = ArtifactMetrics {
            bytes,
            ..Default::default()
        };

        if bytes > 0 && engine.readiness().probe {
            let report = engine.probe(path).await.map_err(|e| {
                IngestError::InvalidArtifact(ArtifactDefect::Unprobeable(format!("{:#}", e)))
            })?;

            metrics.duration_secs = report.duration_secs;
            metrics.sample_rate = report.sample_rate;
            metrics.channels = report.channels;
            metrics.validated = true;
        } else if bytes > 0 {
            debug!("Probe unavailable, skipping validation of {}", path.display());
        }

        self.policy
            .check(&metrics)
            .map_err(IngestError::InvalidArtifact)?;

        Ok(metrics)
    }
}
