// Integration tests for the ingestion pipeline
//
// These run against a scripted engine and verify the filesystem contract:
// one artifact per success, nothing left in scratch, nothing partial in the
// output directory.

mod common;

use anyhow::Result;
use audio_ingest::ingest::{AudioPayload, SourceRetention};
use audio_ingest::transcode::EngineReadiness;
use audio_ingest::{Acknowledgement, FailureKind, RawSubmission};
use common::{entries_in, files_in, FakeEngine, Sandbox, Script};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn submission(bytes: Vec<u8>) -> RawSubmission {
    RawSubmission {
        payload: Some(AudioPayload::Binary(bytes)),
        mime_type: Some("audio/webm".to_string()),
        file_name: None,
    }
}

fn failure_kind(ack: &Acknowledgement) -> Option<FailureKind> {
    match ack {
        Acknowledgement::Failed { kind, .. } => Some(*kind),
        Acknowledgement::Saved { .. } => None,
    }
}

#[tokio::test]
async fn test_success_publishes_one_artifact_and_cleans_scratch() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sandbox = Sandbox::new(temp_dir.path());
    let pipeline = sandbox.pipeline(FakeEngine::succeeding());
    assert_eq!(pipeline.engine().name(), "fake");
    assert_eq!(pipeline.publisher().output_dir(), sandbox.output.as_path());
    assert_eq!(pipeline.stager().scratch_root(), sandbox.scratch.as_path());

    let ack = pipeline.run(submission(vec![1, 2, 3, 4])).await;

    match &ack {
        Acknowledgement::Saved {
            file_name,
            bytes,
            duration_secs,
            channels,
            validated,
            ..
        } => {
            assert!(file_name.ends_with(".mp3"));
            assert_eq!(*bytes, 4);
            assert_eq!(*duration_secs, 2.0);
            assert_eq!(*channels, 1);
            assert!(validated);
        }
        other => panic!("expected success, got {:?}", other),
    }

    let published = files_in(&sandbox.output);
    assert_eq!(published.len(), 1, "Exactly one artifact should be published");
    assert_eq!(entries_in(&sandbox.scratch), 0, "Scratch should be empty");
    assert!(!sandbox.kept.exists(), "Sources are not retained by default");

    Ok(())
}

#[tokio::test]
async fn test_empty_payload_fails_before_any_write() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sandbox = Sandbox::new(temp_dir.path());
    let pipeline = sandbox.pipeline(FakeEngine::succeeding());

    let ack = pipeline.run(submission(Vec::new())).await;
    assert_eq!(failure_kind(&ack), Some(FailureKind::InvalidPayload));

    let ack = pipeline.run(RawSubmission::default()).await;
    assert_eq!(failure_kind(&ack), Some(FailureKind::InvalidPayload));

    // Neither directory was even created
    assert!(!sandbox.scratch.exists());
    assert!(!sandbox.output.exists());

    Ok(())
}

#[tokio::test]
async fn test_unavailable_engine_creates_nothing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sandbox = Sandbox::new(temp_dir.path());
    let pipeline = sandbox.pipeline(FakeEngine::unavailable());

    for _ in 0..3 {
        let ack = pipeline.run(submission(vec![1, 2, 3])).await;
        assert_eq!(failure_kind(&ack), Some(FailureKind::TranscodeUnavailable));
    }

    assert!(files_in(temp_dir.path()).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rejected_input_leaves_no_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sandbox = Sandbox::new(temp_dir.path());
    let pipeline = sandbox.pipeline(FakeEngine::new(Script::RejectInput));

    let ack = pipeline.run(submission(vec![0xde, 0xad, 0xbe, 0xef])).await;

    match &ack {
        Acknowledgement::Failed { kind, error } => {
            assert_eq!(*kind, FailureKind::TranscodeFailed);
            assert!(error.contains("Invalid data"), "Engine diagnostics should be passed on: {}", error);
        }
        other => panic!("expected failure, got {:?}", other),
    }

    assert!(files_in(&sandbox.output).is_empty());
    assert_eq!(entries_in(&sandbox.scratch), 0);

    Ok(())
}

#[tokio::test]
async fn test_implausible_artifacts_are_discarded() -> Result<()> {
    let scripts = [
        Script::EmptyOutput,
        Script::Succeed {
            duration_secs: 0.05,
            channels: 1,
        },
        Script::Succeed {
            duration_secs: 2.0,
            channels: 0,
        },
        Script::ProbeFails,
    ];

    for script in scripts {
        let temp_dir = TempDir::new()?;
        let sandbox = Sandbox::new(temp_dir.path());
        let pipeline = sandbox.pipeline(FakeEngine::new(script));

        let ack = pipeline.run(submission(vec![1, 2, 3])).await;
        assert_eq!(
            failure_kind(&ack),
            Some(FailureKind::InvalidArtifact),
            "{:?} should be rejected",
            script
        );
        assert!(files_in(&sandbox.output).is_empty(), "{:?} left an artifact", script);
        assert_eq!(entries_in(&sandbox.scratch), 0, "{:?} left scratch files", script);
    }

    Ok(())
}

#[tokio::test]
async fn test_short_artifact_reason_names_duration() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sandbox = Sandbox::new(temp_dir.path());
    let pipeline = sandbox.pipeline(FakeEngine::new(Script::Succeed {
        duration_secs: 0.1,
        channels: 1,
    }));

    match pipeline.run(submission(vec![1])).await {
        Acknowledgement::Failed { error, .. } => assert!(error.contains("duration"), "{}", error),
        other => panic!("expected failure, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_missing_probe_stores_unvalidated_artifact() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sandbox = Sandbox::new(temp_dir.path());
    let engine = FakeEngine::succeeding().with_readiness(EngineReadiness {
        encoder: true,
        probe: false,
    });
    let pipeline = sandbox.pipeline(engine);

    let ack = pipeline.run(submission(vec![1, 2, 3])).await;

    match ack {
        Acknowledgement::Saved {
            bytes,
            duration_secs,
            sample_rate,
            channels,
            validated,
            ..
        } => {
            assert_eq!(bytes, 3);
            assert_eq!(duration_secs, 0.0);
            assert_eq!(sample_rate, 0);
            assert_eq!(channels, 0);
            assert!(!validated, "Degraded mode must be visible in the ack");
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(files_in(&sandbox.output).len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_runs_never_collide() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sandbox = Sandbox::new(temp_dir.path());
    let pipeline = Arc::new(sandbox.pipeline(FakeEngine::succeeding().with_delay(Duration::from_millis(20))));

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.run(submission(vec![i; 16])).await })
        })
        .collect();

    let mut names = HashSet::new();
    for handle in handles {
        match handle.await? {
            Acknowledgement::Saved { file_name, .. } => {
                assert!(names.insert(file_name), "Duplicate artifact name");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    assert_eq!(files_in(&sandbox.output).len(), 8);
    assert_eq!(entries_in(&sandbox.scratch), 0);

    Ok(())
}

#[tokio::test]
async fn test_retention_keeps_source_outside_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let sandbox = Sandbox::new(temp_dir.path());
    let pipeline =
        sandbox.pipeline_with_retention(FakeEngine::new(Script::RejectInput), SourceRetention::Always);

    let ack = pipeline
        .run(RawSubmission {
            payload: Some(AudioPayload::Binary(vec![7, 7, 7])),
            mime_type: Some("audio/ogg".to_string()),
            file_name: Some("../../evil.ogg".to_string()),
        })
        .await;
    assert!(!ack.is_saved());

    let kept = files_in(&sandbox.kept);
    assert_eq!(kept.len(), 1);
    let name = kept[0].file_name().and_then(|n| n.to_str()).unwrap_or_default();
    assert!(name.ends_with("_src.ogg"), "Unexpected retained name {}", name);
    assert!(!name.contains("evil"), "Client names never reach the filesystem");
    assert_eq!(std::fs::read(&kept[0])?, vec![7, 7, 7]);

    assert!(files_in(&sandbox.output).is_empty());
    assert_eq!(entries_in(&sandbox.scratch), 0);

    Ok(())
}
