//! ffmpeg/ffprobe subprocess engine

use super::engine::{EngineReadiness, MediaEngine, ProbeReport, TranscodeProfile};
use crate::ingest::IngestError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Longest stderr excerpt carried in a failure
const STDERR_TAIL_CHARS: usize = 2000;

/// Timeout for the `-version` readiness check
const DETECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where to find the engine and how long to let it run
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Upper bound for a single transcode or probe
    pub timeout: Duration,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct FfmpegEngine {
    config: FfmpegConfig,
    readiness: EngineReadiness,
}

impl FfmpegEngine {
    /// Check both binaries once and build the engine
    pub async fn detect(config: FfmpegConfig) -> Self {
        let encoder = Self::binary_responds(&config.ffmpeg_path).await;
        let probe = Self::binary_responds(&config.ffprobe_path).await;

        if encoder && probe {
            info!(
                "Encoding engine ready (ffmpeg={}, ffprobe={})",
                config.ffmpeg_path.display(),
                config.ffprobe_path.display()
            );
        } else {
            warn!(
                "Encoding engine not fully configured (ffmpeg ready={}, ffprobe ready={}). Transcoding may fail",
                encoder, probe
            );
        }

        Self::with_readiness(config, EngineReadiness { encoder, probe })
    }

    /// Build the engine with a known readiness, skipping detection
    pub fn with_readiness(config: FfmpegConfig, readiness: EngineReadiness) -> Self {
        Self { config, readiness }
    }

    async fn binary_responds(path: &Path) -> bool {
        let mut command = Command::new(path);
        command
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(DETECT_TIMEOUT, command.status()).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!("{} not usable: {}", path.display(), e);
                false
            }
            Err(_) => {
                debug!("{} -version timed out", path.display());
                false
            }
        }
    }

    /// Arguments for converting `source` into `target`
    pub fn transcode_args(source: &Path, target: &Path, profile: &TranscodeProfile) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(source.as_os_str().to_owned());

        args.extend(
            [
                "-vn".to_string(), // No video stream
                "-codec:a".to_string(),
                profile.codec.clone(),
                "-b:a".to_string(),
                format!("{}k", profile.bitrate_kbps),
                "-ac".to_string(),
                profile.channels.to_string(),
                "-ar".to_string(),
                profile.sample_rate.to_string(),
                "-f".to_string(),
                profile.format.clone(),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(target.as_os_str().to_owned());

        args
    }

    /// Pull the report out of `ffprobe -print_format json` output
    pub fn parse_probe_output(stdout: &[u8]) -> Result<ProbeReport> {
        let output: FfprobeOutput =
            serde_json::from_slice(stdout).context("Failed to parse ffprobe output")?;

        let stream = output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("audio"));
        let format = output.format.unwrap_or_default();

        let duration_secs = stream
            .and_then(|s| parse_number::<f64>(s.duration.as_deref()))
            .filter(|d| *d > 0.0)
            .or_else(|| parse_number::<f64>(format.duration.as_deref()))
            .filter(|d| d.is_finite())
            .unwrap_or(0.0);

        Ok(ProbeReport {
            duration_secs,
            sample_rate: stream
                .and_then(|s| parse_number(s.sample_rate.as_deref()))
                .unwrap_or(0),
            channels: stream.and_then(|s| s.channels).unwrap_or(0),
        })
    }
}

#[async_trait::async_trait]
impl MediaEngine for FfmpegEngine {
    fn readiness(&self) -> EngineReadiness {
        self.readiness
    }

    async fn transcode(
        &self,
        source: &Path,
        target: &Path,
        profile: &TranscodeProfile,
    ) -> Result<(), IngestError> {
        if !self.readiness.encoder {
            return Err(IngestError::TranscodeUnavailable(
                "ffmpeg/ffprobe not configured".to_string(),
            ));
        }

        let args = Self::transcode_args(source, target, profile);
        debug!(
            "[ffmpeg] {} {}",
            self.config.ffmpeg_path.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    IngestError::TranscodeUnavailable(format!(
                        "{} not found",
                        self.config.ffmpeg_path.display()
                    ))
                } else {
                    IngestError::TranscodeFailed(format!("failed to start ffmpeg: {}", e))
                }
            })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                IngestError::TranscodeFailed(format!(
                    "ffmpeg timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            })?
            .map_err(|e| IngestError::TranscodeFailed(format!("ffmpeg stream error: {}", e)))?;

        if !output.status.success() {
            return Err(IngestError::TranscodeFailed(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            )));
        }

        Ok(())
    }

    async fn probe(&self, path: &Path) -> Result<ProbeReport> {
        if !self.readiness.probe {
            anyhow::bail!("ffprobe not configured");
        }

        let mut command = Command::new(&self.config.ffprobe_path);
        command
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.config.timeout, command.output())
            .await
            .map_err(|_| {
                anyhow::anyhow!("ffprobe timed out after {}s", self.config.timeout.as_secs())
            })?
            .context("Failed to run ffprobe")?;

        if !output.status.success() {
            anyhow::bail!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            );
        }

        Self::parse_probe_output(&output.stdout)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    duration: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return text.to_string();
    }
    text.chars().skip(count - STDERR_TAIL_CHARS).collect()
}
