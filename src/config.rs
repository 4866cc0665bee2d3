use crate::ingest::{SourceRetention, ValidationPolicy};
use crate::transcode::FfmpegConfig;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variables look like `AUDIO_INGEST__SERVICE__HTTP__PORT=5000`
const ENV_PREFIX: &str = "AUDIO_INGEST";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub transcoder: TranscoderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
    /// Largest WebSocket message accepted from a client
    pub max_message_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Durable directory for published artifacts
    pub output_dir: String,
    /// Scratch root; defaults to `<system temp>/audio-ingest`
    pub scratch_dir: Option<String>,
    pub source_retention: SourceRetention,
    /// Where retained sources go; defaults to `audio-sources` next to the output directory
    pub retained_sources_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscoderConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub timeout_secs: u64,
    pub min_duration_secs: f64,
}

/// Values given on the command line, applied over file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub output_dir: Option<String>,
}

impl Config {
    /// Defaults, then the (optional) file at `path`, then the environment
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with_overrides(path, &ConfigOverrides::default())
    }

    pub fn load_with_overrides(path: &str, overrides: &ConfigOverrides) -> Result<Self> {
        let mut builder = Self::defaults_builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(bind) = &overrides.bind {
            builder = builder.set_override("service.http.bind", bind.as_str())?;
        }
        if let Some(port) = overrides.port {
            builder = builder.set_override("service.http.port", i64::from(port))?;
        }
        if let Some(output_dir) = &overrides.output_dir {
            builder = builder.set_override("storage.output_dir", output_dir.as_str())?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Built-in defaults only
    pub fn defaults() -> Result<Self> {
        Ok(Self::defaults_builder()?.build()?.try_deserialize()?)
    }

    fn defaults_builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("service.name", "audio-ingest")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 5000_i64)?
            .set_default("service.max_message_bytes", 100 * 1024 * 1024_i64)?
            .set_default("storage.output_dir", "audio-chunks")?
            .set_default("storage.source_retention", "never")?
            .set_default("transcoder.ffmpeg_path", "ffmpeg")?
            .set_default("transcoder.ffprobe_path", "ffprobe")?
            .set_default("transcoder.timeout_secs", 120_i64)?
            .set_default("transcoder.min_duration_secs", 0.2)?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }

    pub fn output_dir(&self) -> PathBuf {
        expand(&self.storage.output_dir)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        match &self.storage.scratch_dir {
            Some(dir) => expand(dir),
            None => std::env::temp_dir().join("audio-ingest"),
        }
    }

    pub fn retained_sources_dir(&self) -> PathBuf {
        if let Some(dir) = &self.storage.retained_sources_dir {
            return expand(dir);
        }

        let output = self.output_dir();
        match output.parent() {
            Some(parent) => parent.join("audio-sources"),
            None => PathBuf::from("audio-sources"),
        }
    }

    pub fn ffmpeg(&self) -> FfmpegConfig {
        FfmpegConfig {
            ffmpeg_path: expand(&self.transcoder.ffmpeg_path),
            ffprobe_path: expand(&self.transcoder.ffprobe_path),
            timeout: Duration::from_secs(self.transcoder.timeout_secs),
        }
    }

    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            min_duration_secs: self.transcoder.min_duration_secs,
            ..ValidationPolicy::default()
        }
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
