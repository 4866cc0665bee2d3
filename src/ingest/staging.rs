use super::error::IngestError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// When to keep a copy of the original upload for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRetention {
    #[default]
    Never,
    OnFailure,
    Always,
}

impl SourceRetention {
    fn applies(self, succeeded: bool) -> bool {
        match self {
            Self::Never => false,
            Self::OnFailure => !succeeded,
            Self::Always => true,
        }
    }
}

/// Writes uploads into private per-run scratch directories
#[derive(Debug, Clone)]
pub struct Stager {
    scratch_root: PathBuf,
    retention: SourceRetention,
    retained_dir: PathBuf,
}

impl Stager {
    pub fn new(scratch_root: PathBuf, retention: SourceRetention, retained_dir: PathBuf) -> Self {
        Self {
            scratch_root,
            retention,
            retained_dir,
        }
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Write `bytes` to `<scratch>/<base>-XXXXXX/<base>_src.<ext>`
    pub async fn stage(&self, bytes: &[u8], base: &str, ext: &str) -> Result<StagedFile, IngestError> {
        tokio::fs::create_dir_all(&self.scratch_root)
            .await
            .map_err(IngestError::stage_write("create scratch root"))?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", base))
            .tempdir_in(&self.scratch_root)
            .map_err(IngestError::stage_write("create run directory"))?;

        let source = dir.path().join(format!("{}_src.{}", base, ext));

        // On failure `dir` drops here and takes the partial file with it
        tokio::fs::write(&source, bytes)
            .await
            .map_err(IngestError::stage_write("write source"))?;

        debug!("Staged {} bytes at {}", bytes.len(), source.display());

        Ok(StagedFile {
            dir: Some(dir),
            source,
            base: base.to_string(),
            retention: self.retention,
            retained_dir: self.retained_dir.clone(),
        })
    }
}

/// An upload sitting in its run's scratch directory
///
/// The directory is removed when this value goes away. `finish` is the normal
/// path; dropping it (early return, panic in the run) removes it as well.
#[derive(Debug)]
pub struct StagedFile {
    dir: Option<TempDir>,
    source: PathBuf,
    base: String,
    retention: SourceRetention,
    retained_dir: PathBuf,
}

impl StagedFile {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn base_name(&self) -> &str {
        &self.base
    }

    /// Path inside the run directory where the transcoder should write
    pub fn output_path(&self, extension: &str) -> PathBuf {
        self.source.with_file_name(format!("{}.{}", self.base, extension))
    }

    /// Apply the retention policy, then remove the run directory
    pub async fn finish(mut self, succeeded: bool) {
        if self.retention.applies(succeeded) {
            if let Err(e) = self.retain().await {
                warn!("Failed to retain source {}: {}", self.source.display(), e);
            }
        }

        let Some(dir) = self.dir.take() else {
            return;
        };
        let path = dir.path().to_path_buf();

        match tokio::task::spawn_blocking(move || dir.close()).await {
            Ok(Ok(())) => debug!("Removed scratch directory {}", path.display()),
            Ok(Err(e)) => warn!("Failed to remove scratch directory {}: {}", path.display(), e),
            Err(e) => warn!("Scratch cleanup task failed for {}: {}", path.display(), e),
        }
    }

    async fn retain(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.retained_dir).await?;

        let file_name = self
            .source
            .file_name()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "source has no file name"))?;
        let target = self.retained_dir.join(file_name);
        tokio::fs::copy(&self.source, &target).await?;

        info!("Retained source at {}", target.display());
        Ok(())
    }
}
