// Shared helpers for integration tests
//
// `FakeEngine` stands in for ffmpeg so pipeline and socket behavior can be
// exercised on machines without an encoder.

#![allow(dead_code)]

use anyhow::Result;
use audio_ingest::ingest::{Publisher, SourceRetention, Stager, ValidationPolicy, Validator};
use audio_ingest::transcode::{EngineReadiness, MediaEngine, ProbeReport, TranscodeProfile};
use audio_ingest::{IngestError, IngestPipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// What the fake engine does with each file
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Copy the source and report the given metrics
    Succeed { duration_secs: f64, channels: u16 },
    /// Leave a partial output behind and fail
    RejectInput,
    /// Produce a zero-byte output
    EmptyOutput,
    /// Transcode fine, then fail to probe
    ProbeFails,
}

pub struct FakeEngine {
    readiness: EngineReadiness,
    script: Script,
    delay: Duration,
}

impl FakeEngine {
    pub fn new(script: Script) -> Self {
        Self {
            readiness: EngineReadiness::ready(),
            script,
            delay: Duration::ZERO,
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Script::Succeed {
            duration_secs: 2.0,
            channels: 1,
        })
    }

    pub fn unavailable() -> Self {
        Self {
            readiness: EngineReadiness::unavailable(),
            ..Self::succeeding()
        }
    }

    pub fn with_readiness(mut self, readiness: EngineReadiness) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl MediaEngine for FakeEngine {
    fn readiness(&self) -> EngineReadiness {
        self.readiness
    }

    async fn transcode(
        &self,
        source: &Path,
        target: &Path,
        _profile: &TranscodeProfile,
    ) -> Result<(), IngestError> {
        if !self.readiness.encoder {
            return Err(IngestError::TranscodeUnavailable("fake engine offline".to_string()));
        }

        tokio::time::sleep(self.delay).await;

        match self.script {
            Script::RejectInput => {
                tokio::fs::write(target, b"partial").await.ok();
                Err(IngestError::TranscodeFailed(
                    "Invalid data found when processing input".to_string(),
                ))
            }
            Script::EmptyOutput => {
                tokio::fs::write(target, b"").await.ok();
                Ok(())
            }
            Script::Succeed { .. } | Script::ProbeFails => {
                tokio::fs::copy(source, target)
                    .await
                    .map_err(|e| IngestError::TranscodeFailed(e.to_string()))?;
                Ok(())
            }
        }
    }

    async fn probe(&self, _path: &Path) -> Result<ProbeReport> {
        if !self.readiness.probe {
            anyhow::bail!("fake probe offline");
        }

        match self.script {
            Script::Succeed {
                duration_secs,
                channels,
            } => Ok(ProbeReport {
                duration_secs,
                sample_rate: 44100,
                channels,
            }),
            Script::ProbeFails => anyhow::bail!("moov atom not found"),
            _ => Ok(ProbeReport::default()),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Directory layout of one test sandbox
pub struct Sandbox {
    pub scratch: PathBuf,
    pub output: PathBuf,
    pub kept: PathBuf,
}

impl Sandbox {
    pub fn new(root: &Path) -> Self {
        Self {
            scratch: root.join("scratch"),
            output: root.join("audio-chunks"),
            kept: root.join("audio-sources"),
        }
    }

    pub fn pipeline(&self, engine: impl MediaEngine + 'static) -> IngestPipeline {
        self.pipeline_with_retention(engine, SourceRetention::Never)
    }

    pub fn pipeline_with_retention(
        &self,
        engine: impl MediaEngine + 'static,
        retention: SourceRetention,
    ) -> IngestPipeline {
        IngestPipeline::new(
            Arc::new(engine),
            Stager::new(self.scratch.clone(), retention, self.kept.clone()),
            Validator::new(ValidationPolicy::default()),
            Publisher::new(self.output.clone()),
        )
    }
}

/// Files in `dir`, recursively; a missing directory has none
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(files_in(&path));
        } else {
            files.push(path);
        }
    }
    files
}

/// Entries (files or directories) directly under `dir`
pub fn entries_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// A mono 16-bit WAV with a 440 Hz tone
pub fn sine_wav(seconds: f64, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(std::io::Cursor::new(&mut buf), spec)
            .expect("Failed to create WAV writer");
        let total = (seconds * sample_rate as f64) as usize;
        for i in 0..total {
            let t = i as f64 / sample_rate as f64;
            let sample = (t * 440.0 * std::f64::consts::TAU).sin() * i16::MAX as f64 * 0.5;
            writer
                .write_sample(sample as i16)
                .expect("Failed to write sample");
        }
        writer.finalize().expect("Failed to finalize WAV");
    }
    buf
}

/// Bytes that no decoder will accept as audio
pub fn noise_bytes(len: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(len);
    while bytes.len() < len {
        bytes.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
    }
    bytes.truncate(len);
    bytes
}
