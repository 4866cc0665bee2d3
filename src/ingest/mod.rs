//! Server-side ingestion of recorded audio
//!
//! One submission flows through:
//! - payload normalization (any wire shape → canonical bytes)
//! - staging into a private scratch directory
//! - transcoding with the media engine
//! - validation of the produced file
//! - publishing into the output directory
//!
//! and always ends in exactly one `Acknowledgement`.

mod ack;
mod error;
pub mod naming;
pub mod payload;
mod pipeline;
pub mod publish;
pub mod staging;
pub mod validate;

pub use ack::Acknowledgement;
pub use error::{ArtifactDefect, FailureKind, IngestError};
pub use payload::AudioPayload;
pub use pipeline::{IngestPipeline, RawSubmission, Submission};
pub use publish::{Artifact, Publisher};
pub use staging::{SourceRetention, StagedFile, Stager};
pub use validate::{ArtifactMetrics, ValidationPolicy, Validator};
