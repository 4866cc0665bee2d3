// Tests against a real ffmpeg/ffprobe installation
//
// Each test returns early when the binaries are not on PATH, so the suite
// still passes on machines without them.

mod common;

use anyhow::Result;
use audio_ingest::ingest::AudioPayload;
use audio_ingest::transcode::{FfmpegConfig, FfmpegEngine, MediaEngine};
use audio_ingest::{Acknowledgement, FailureKind, RawSubmission};
use common::{entries_in, files_in, noise_bytes, sine_wav, Sandbox};
use tempfile::TempDir;

async fn detect() -> Option<FfmpegEngine> {
    let engine = FfmpegEngine::detect(FfmpegConfig::default()).await;
    let readiness = engine.readiness();
    if readiness.encoder && readiness.probe {
        Some(engine)
    } else {
        eprintln!("Skipping: ffmpeg/ffprobe not available");
        None
    }
}

fn submission(bytes: Vec<u8>, mime_type: &str) -> RawSubmission {
    RawSubmission {
        payload: Some(AudioPayload::Binary(bytes)),
        mime_type: Some(mime_type.to_string()),
        file_name: None,
    }
}

#[tokio::test]
async fn test_wav_is_transcoded_to_mono_mp3() -> Result<()> {
    let Some(engine) = detect().await else {
        return Ok(());
    };
    let temp_dir = TempDir::new()?;
    let sandbox = Sandbox::new(temp_dir.path());
    let pipeline = sandbox.pipeline(engine);

    // The declared type is wrong on purpose; ffmpeg sniffs the container
    let ack = pipeline.run(submission(sine_wav(2.0, 48000), "audio/webm")).await;

    match ack {
        Acknowledgement::Saved {
            file_name,
            bytes,
            duration_secs,
            sample_rate,
            channels,
            validated,
        } => {
            assert!(file_name.ends_with(".mp3"));
            assert!(bytes > 0);
            assert!(
                (1.8..=2.2).contains(&duration_secs),
                "Unexpected duration {}",
                duration_secs
            );
            assert_eq!(sample_rate, 44100);
            assert_eq!(channels, 1);
            assert!(validated);
        }
        Acknowledgement::Failed { error, .. } if error.contains("libmp3lame") => {
            eprintln!("Skipping: ffmpeg built without libmp3lame");
            return Ok(());
        }
        other => panic!("expected success, got {:?}", other),
    }

    assert_eq!(files_in(&sandbox.output).len(), 1);
    assert_eq!(entries_in(&sandbox.scratch), 0);

    Ok(())
}

#[tokio::test]
async fn test_noise_is_rejected_without_leftovers() -> Result<()> {
    let Some(engine) = detect().await else {
        return Ok(());
    };
    let temp_dir = TempDir::new()?;
    let sandbox = Sandbox::new(temp_dir.path());
    let pipeline = sandbox.pipeline(engine);

    let ack = pipeline.run(submission(noise_bytes(4096), "audio/webm")).await;

    match ack {
        Acknowledgement::Failed { kind, .. } => assert!(
            matches!(kind, FailureKind::TranscodeFailed | FailureKind::InvalidArtifact),
            "Unexpected failure kind {:?}",
            kind
        ),
        other => panic!("noise should not be stored: {:?}", other),
    }

    assert!(files_in(&sandbox.output).is_empty());
    assert_eq!(entries_in(&sandbox.scratch), 0);

    Ok(())
}

#[tokio::test]
async fn test_probe_reports_wav_metrics() -> Result<()> {
    let Some(engine) = detect().await else {
        return Ok(());
    };
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("tone.wav");
    std::fs::write(&path, sine_wav(1.0, 22050))?;

    let report = engine.probe(&path).await?;
    assert!((report.duration_secs - 1.0).abs() < 0.05);
    assert_eq!(report.sample_rate, 22050);
    assert_eq!(report.channels, 1);

    Ok(())
}
