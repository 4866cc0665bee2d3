use super::error::IngestError;
use super::naming;
use super::validate::ArtifactMetrics;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Attempts at finding a free name before giving up
const MAX_NAME_ATTEMPTS: usize = 8;

/// A validated file in the output directory
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub file_name: String,
    pub path: PathBuf,
    pub metrics: ArtifactMetrics,
}

/// Moves validated files into the durable output directory
///
/// The directory is append-only. A name is claimed with a hard link, which
/// fails instead of replacing an existing file, so concurrent publishers never
/// need to coordinate.
#[derive(Debug, Clone)]
pub struct Publisher {
    output_dir: PathBuf,
}

impl Publisher {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Move `produced` to `<output>/<base>.<extension>`, or a fresh name if taken
    pub async fn publish(
        &self,
        produced: &Path,
        base: &str,
        extension: &str,
        metrics: ArtifactMetrics,
    ) -> Result<Artifact, IngestError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(IngestError::publish("create output directory"))?;

        let (file_name, path) = match self.claim(produced, base, extension).await {
            Ok(claimed) => claimed,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(IngestError::Publish {
                    context: "pick output name",
                    source: e,
                });
            }
            Err(e) => {
                // Scratch and output may live on different filesystems
                debug!("Linking into output failed ({}), copying instead", e);
                self.copy_in(produced, base, extension).await?
            }
        };

        discard(produced).await;

        Ok(Artifact {
            file_name,
            path,
            metrics,
        })
    }

    /// Link `file` under the first free name, regenerating the base on collision
    async fn claim(
        &self,
        file: &Path,
        base: &str,
        extension: &str,
    ) -> std::io::Result<(String, PathBuf)> {
        let mut file_name = format!("{}.{}", base, extension);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let target = self.output_dir.join(&file_name);
            match tokio::fs::hard_link(file, &target).await {
                Ok(()) => return Ok((file_name, target)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    warn!("Output name {} already taken, regenerating", file_name);
                    file_name = format!("{}.{}", naming::base_name(Local::now()), extension);
                }
                Err(e) => return Err(e),
            }
        }

        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "no free output name",
        ))
    }

    /// Copy into a hidden sibling inside the output directory, then claim a name from there
    async fn copy_in(
        &self,
        produced: &Path,
        base: &str,
        extension: &str,
    ) -> Result<(String, PathBuf), IngestError> {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let partial = self.output_dir.join(format!(".{}-{}.part", base, &suffix[..8]));

        let result = async {
            tokio::fs::copy(produced, &partial).await?;
            self.claim(&partial, base, extension).await
        }
        .await;

        discard(&partial).await;

        result.map_err(|source| IngestError::Publish {
            context: "copy into output directory",
            source,
        })
    }
}

/// Best-effort removal of a file that must not survive the run
pub async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Discarded {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to discard {}: {}", path.display(), e),
    }
}
