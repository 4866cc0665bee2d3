use super::ack::Acknowledgement;
use super::error::IngestError;
use super::naming;
use super::payload::{self, AudioPayload};
use super::publish::{self, Artifact, Publisher};
use super::staging::{StagedFile, Stager};
use super::validate::Validator;
use crate::config::Config;
use crate::transcode::{MediaEngine, TranscodeProfile};
use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// A submission as it came off the wire, before normalization
#[derive(Debug, Clone, Default)]
pub struct RawSubmission {
    pub payload: Option<AudioPayload>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

/// A submission with canonical, non-empty bytes
#[derive(Debug, Clone)]
pub struct Submission {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

impl Submission {
    pub fn normalize(raw: RawSubmission) -> Result<Self, IngestError> {
        let payload = raw
            .payload
            .ok_or_else(|| IngestError::invalid_payload("no audio data"))?;

        Ok(Self {
            bytes: payload::normalize(payload)?,
            mime_type: raw.mime_type,
            file_name: raw.file_name,
        })
    }
}

/// normalize → stage → transcode → validate → publish
///
/// Holds no mutable state; one instance is shared by every connection and
/// each `run` is independent of the others.
pub struct IngestPipeline {
    engine: Arc<dyn MediaEngine>,
    stager: Stager,
    validator: Validator,
    publisher: Publisher,
    profile: TranscodeProfile,
}

impl IngestPipeline {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        stager: Stager,
        validator: Validator,
        publisher: Publisher,
    ) -> Self {
        Self {
            engine,
            stager,
            validator,
            publisher,
            profile: TranscodeProfile::default(),
        }
    }

    /// Wire the stages up from the process configuration
    pub fn from_config(cfg: &Config, engine: Arc<dyn MediaEngine>) -> Self {
        Self::new(
            engine,
            Stager::new(
                cfg.scratch_dir(),
                cfg.storage.source_retention,
                cfg.retained_sources_dir(),
            ),
            Validator::new(cfg.validation_policy()),
            Publisher::new(cfg.output_dir()),
        )
    }

    pub fn engine(&self) -> &dyn MediaEngine {
        self.engine.as_ref()
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn stager(&self) -> &Stager {
        &self.stager
    }

    /// Process one submission to exactly one acknowledgement
    pub async fn run(&self, raw: RawSubmission) -> Acknowledgement {
        match self.process(raw).await {
            Ok(artifact) => {
                let m = &artifact.metrics;
                if m.validated {
                    info!(
                        "[OK] {} ({} bytes, {:.2}s, {}Hz, ch={})",
                        artifact.file_name, m.bytes, m.duration_secs, m.sample_rate, m.channels
                    );
                } else {
                    info!("[OK] {} ({} bytes, unvalidated)", artifact.file_name, m.bytes);
                }
                Acknowledgement::saved(&artifact)
            }
            Err(e) => {
                warn!("[FAIL] {}", e);
                Acknowledgement::failed(&e)
            }
        }
    }

    async fn process(&self, raw: RawSubmission) -> Result<Artifact, IngestError> {
        let submission = Submission::normalize(raw)?;

        // Nothing touches the disk when the encoder is missing
        if !self.engine.readiness().encoder {
            return Err(IngestError::TranscodeUnavailable(
                "ffmpeg/ffprobe not configured".to_string(),
            ));
        }

        let base = naming::base_name(Local::now());
        let extension = naming::source_extension(
            submission.mime_type.as_deref(),
            submission.file_name.as_deref(),
        );

        let staged = self
            .stager
            .stage(&submission.bytes, &base, &extension)
            .await?;
        let produced = staged.output_path(&self.profile.extension);

        let result = self.convert(&staged, &produced).await;
        if result.is_err() {
            publish::discard(&produced).await;
        }
        staged.finish(result.is_ok()).await;

        result
    }

    async fn convert(&self, staged: &StagedFile, produced: &Path) -> Result<Artifact, IngestError> {
        self.engine
            .transcode(staged.source(), produced, &self.profile)
            .await?;

        let metrics = self
            .validator
            .validate(self.engine.as_ref(), produced)
            .await?;

        self.publisher
            .publish(produced, staged.base_name(), &self.profile.extension, metrics)
            .await
    }
}
