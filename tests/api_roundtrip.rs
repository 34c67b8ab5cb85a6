//! Full daemon round trips: a real server on a temp socket, the client
//! from `api::client`, real stores under a temp dir, mock transcription.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use clipdex::api::client::send_request;
use clipdex::api::handler::ApiHandler;
use clipdex::api::protocol::{ProfileInfo, Request, Response};
use clipdex::api::server::ApiServer;
use clipdex::app::AppState;
use clipdex::config::{Config, StorageConfig};
use clipdex::job::state::JobStatus;
use clipdex::search::SearchMode;
use clipdex::stt::transcriber::MockTranscriber;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

fn make_wav(samples: &[i16]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    cursor.into_inner()
}

/// Start a daemon with a mock transcriber; returns the socket path.
async fn start_daemon(tmp: &TempDir, transcriber: MockTranscriber) -> PathBuf {
    let socket_path = tmp.path().join("clipdex.sock");
    let config = Config {
        storage: StorageConfig {
            data_dir: Some(tmp.path().join("data")),
        },
        ..Default::default()
    };
    let state = Arc::new(AppState::build(config, Arc::new(transcriber)).unwrap());

    let server_socket = socket_path.clone();
    tokio::spawn(async move {
        let server = ApiServer::new(server_socket).unwrap();
        server.start(ApiHandler::new(state)).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    socket_path
}

async fn create_profile(socket: &Path, name: &str) -> ProfileInfo {
    let response = send_request(
        socket,
        Request::CreateProfile {
            name: name.to_string(),
        },
    )
    .await
    .unwrap();
    match response {
        Response::Profile { profile } => profile,
        other => panic!("Expected Profile response, got {:?}", other),
    }
}

async fn submit_wav(socket: &Path, profile_id: Uuid, samples: &[i16]) -> Uuid {
    let response = send_request(
        socket,
        Request::Submit {
            profile_id,
            filename: "take.wav".to_string(),
            audio_base64: BASE64.encode(make_wav(samples)),
        },
    )
    .await
    .unwrap();
    match response {
        Response::Submitted { job_id, .. } => job_id,
        other => panic!("Expected Submitted response, got {:?}", other),
    }
}

async fn wait_terminal(socket: &Path, job_id: Uuid) -> (JobStatus, u8, usize) {
    for _ in 0..300 {
        let response = send_request(socket, Request::JobStatus { job_id })
            .await
            .unwrap();
        if let Response::Job { job } = response
            && job.status.is_terminal()
        {
            return (job.status, job.progress, job.clips_created);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish");
}

#[tokio::test]
async fn upload_transcribe_search_export_flow() {
    let tmp = TempDir::new().unwrap();
    let transcriber = MockTranscriber::new("mock")
        .with_segment(0.2, 1.4, "quick brown fox")
        .with_segment(1.4, 2.6, "lazy dog");
    let socket = start_daemon(&tmp, transcriber).await;

    let profile = create_profile(&socket, "fixtures").await;
    let job_id = submit_wav(&socket, profile.id, &[250i16; 16000 * 3]).await;

    let (status, progress, clips_created) = wait_terminal(&socket, job_id).await;
    assert_eq!(status, JobStatus::Done);
    assert_eq!(progress, 100);
    assert_eq!(clips_created, 2);

    // Search over the socket
    let response = send_request(
        &socket,
        Request::Search {
            query: "brown fox".to_string(),
            profile_id: Some(profile.id),
            mode: SearchMode::Basic,
            limit: None,
        },
    )
    .await
    .unwrap();
    let clip_id = match response {
        Response::SearchResults { results } => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].transcript, "quick brown fox");
            results[0].id
        }
        other => panic!("Expected SearchResults, got {:?}", other),
    };

    // Export the matched clip
    let response = send_request(&socket, Request::ExportClip { clip_id })
        .await
        .unwrap();
    match response {
        Response::ClipAudio { path, filename } => {
            assert_eq!(filename, "quick brown fox.wav");
            assert!(PathBuf::from(path).exists());
        }
        other => panic!("Expected ClipAudio, got {:?}", other),
    }

    // Delete the clip; its cached cut goes too
    let response = send_request(
        &socket,
        Request::BulkDeleteClips {
            clip_ids: vec![clip_id, clip_id],
        },
    )
    .await
    .unwrap();
    assert_eq!(response, Response::Deleted { deleted: 1 });
}

#[tokio::test]
async fn cancel_over_socket_is_idempotent_and_final() {
    let tmp = TempDir::new().unwrap();
    let transcriber = MockTranscriber::new("mock")
        .with_progress_steps(100)
        .with_step_delay(Duration::from_millis(20))
        .with_segment(0.0, 1.0, "never");
    let socket = start_daemon(&tmp, transcriber).await;

    let profile = create_profile(&socket, "cancel me").await;
    let job_id = submit_wav(&socket, profile.id, &[1i16; 16000]).await;

    tokio::time::sleep(Duration::from_millis(60)).await;
    for _ in 0..2 {
        let response = send_request(&socket, Request::CancelJob { job_id })
            .await
            .unwrap();
        assert_eq!(response, Response::Ok, "cancel is ok every time");
    }

    let (status, progress, clips_created) = wait_terminal(&socket, job_id).await;
    assert_eq!(status, JobStatus::Cancelled);
    assert!(progress < 100);
    assert_eq!(clips_created, 0);

    // Still ok after terminal, and the status stays cancelled.
    let response = send_request(&socket, Request::CancelJob { job_id })
        .await
        .unwrap();
    assert_eq!(response, Response::Ok);
    let (status, _, _) = wait_terminal(&socket, job_id).await;
    assert_eq!(status, JobStatus::Cancelled);
}

#[tokio::test]
async fn unknown_ids_surface_as_protocol_errors() {
    let tmp = TempDir::new().unwrap();
    let socket = start_daemon(&tmp, MockTranscriber::new("mock")).await;

    let response = send_request(
        &socket,
        Request::JobStatus {
            job_id: Uuid::new_v4(),
        },
    )
    .await
    .unwrap();
    assert!(matches!(response, Response::Error { .. }));

    let response = send_request(
        &socket,
        Request::CancelJob {
            job_id: Uuid::new_v4(),
        },
    )
    .await
    .unwrap();
    assert!(matches!(response, Response::Error { .. }));

    let response = send_request(
        &socket,
        Request::DeleteProfile {
            profile_id: Uuid::new_v4(),
        },
    )
    .await
    .unwrap();
    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn rejects_non_wav_upload_over_socket() {
    let tmp = TempDir::new().unwrap();
    let socket = start_daemon(&tmp, MockTranscriber::new("mock")).await;
    let profile = create_profile(&socket, "formats").await;

    let response = send_request(
        &socket,
        Request::Submit {
            profile_id: profile.id,
            filename: "song.mp3".to_string(),
            audio_base64: BASE64.encode(b"whatever"),
        },
    )
    .await
    .unwrap();
    match response {
        Response::Error { message } => {
            assert!(message.contains("Unsupported audio format"));
        }
        other => panic!("Expected Error response, got {:?}", other),
    }
}
