use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vod_backend::modules::upload::dto::{
    CompleteUploadResponse, HlsInfo, InitUploadResponse, ProcessingPhase, ProcessingReport,
    ProcessingStatusResponse, UploadedPart, VideoMetadata,
};
use vod_backend::uploader::config::UploadConfig;
use vod_backend::uploader::controller::{UploadController, UploadPhase};
use vod_backend::uploader::error::{PartError, UploadError};
use vod_backend::uploader::gateway::{
    CompleteUploadBody, GatewayError, InitUploadBody, StatusSource, UploadGateway,
};
use vod_backend::uploader::orchestrator::{
    NoProgress, ProgressSink, UploadProgress, UploadedFile, upload_file,
};
use vod_backend::uploader::part::PartTransport;
use vod_backend::uploader::poller::PollOptions;
use vod_backend::uploader::source::MemoryFile;

const MIB: usize = 1024 * 1024;

/// In-memory stand-in for the HTTP gateway, recording every session
/// operation it serves.
#[derive(Default)]
struct FakeGateway {
    init_calls: Mutex<Vec<(String, String, i32)>>,
    sign_calls: Mutex<Vec<(String, i32)>>,
    complete_calls: Mutex<Vec<(String, Vec<UploadedPart>)>>,
    abort_calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    fn signed_parts(&self) -> Vec<i32> {
        self.sign_calls.lock().unwrap().iter().map(|(_, n)| *n).collect()
    }

    fn completions(&self) -> Vec<(String, Vec<UploadedPart>)> {
        self.complete_calls.lock().unwrap().clone()
    }

    fn aborts(&self) -> Vec<String> {
        self.abort_calls.lock().unwrap().clone()
    }
}

impl UploadGateway for FakeGateway {
    async fn initialize(&self, req: &InitUploadBody) -> Result<InitUploadResponse, GatewayError> {
        self.init_calls.lock().unwrap().push((
            req.file_name.clone(),
            req.file_id.clone(),
            req.total_chunks,
        ));
        Ok(InitUploadResponse {
            success: true,
            upload_id: format!("upload-{}", req.file_id),
            s3_key: format!("uploads/{}.mp4", req.file_id),
            file_name: req.file_name.clone(),
        })
    }

    async fn sign_part(
        &self,
        upload_id: &str,
        part_number: i32,
        _s3_key: &str,
    ) -> Result<String, GatewayError> {
        self.sign_calls
            .lock()
            .unwrap()
            .push((upload_id.to_string(), part_number));
        Ok(format!("https://storage.test/signed/{part_number}"))
    }

    async fn complete(
        &self,
        req: &CompleteUploadBody,
    ) -> Result<CompleteUploadResponse, GatewayError> {
        self.complete_calls
            .lock()
            .unwrap()
            .push((req.upload_id.clone(), req.parts.clone()));
        Ok(CompleteUploadResponse {
            success: true,
            s3_url: format!("https://storage.test/{}", req.s3_key),
            file_size: 12 * MIB as i64,
            file_name: req.file_name.clone(),
            parts_completed: req.parts.len(),
        })
    }

    async fn abort(&self, upload_id: &str, _s3_key: &str) -> Result<(), GatewayError> {
        self.abort_calls.lock().unwrap().push(upload_id.to_string());
        Ok(())
    }
}

/// Transport whose failure script is keyed by part number; optionally
/// cancels a token the first time a given part is attempted.
#[derive(Default)]
struct FlakyTransport {
    failures_left: Mutex<HashMap<i32, u32>>,
    attempts: Mutex<HashMap<i32, u32>>,
    cancel_on_part: Mutex<Option<(i32, CancellationToken)>>,
}

impl FlakyTransport {
    fn failing(script: &[(i32, u32)]) -> Self {
        Self {
            failures_left: Mutex::new(script.iter().copied().collect()),
            ..Self::default()
        }
    }

    fn cancelling_on(part_number: i32, token: CancellationToken) -> Self {
        Self {
            cancel_on_part: Mutex::new(Some((part_number, token))),
            ..Self::default()
        }
    }

    fn attempts_for(&self, part_number: i32) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(&part_number)
            .copied()
            .unwrap_or(0)
    }
}

impl PartTransport for FlakyTransport {
    async fn put_part(&self, url: &str, _body: Bytes) -> Result<String, PartError> {
        let part_number: i32 = url
            .rsplit('/')
            .next()
            .and_then(|n| n.parse().ok())
            .expect("signed url carries the part number");
        *self.attempts.lock().unwrap().entry(part_number).or_insert(0) += 1;

        if let Some((cancel_part, token)) = self.cancel_on_part.lock().unwrap().take_if(|(p, _)| *p == part_number) {
            assert_eq!(cancel_part, part_number);
            token.cancel();
        }

        let mut failures = self.failures_left.lock().unwrap();
        if let Some(left) = failures.get_mut(&part_number) {
            if *left > 0 {
                *left -= 1;
                return Err(PartError::Status(500));
            }
        }
        Ok(format!("\"etag-part-{part_number}\""))
    }
}

#[derive(Default)]
struct RecordingSink {
    updates: Mutex<Vec<UploadProgress>>,
}

impl ProgressSink for RecordingSink {
    fn report(&self, update: UploadProgress) {
        self.updates.lock().unwrap().push(update);
    }
}

fn config() -> UploadConfig {
    UploadConfig {
        max_retries: 3,
        retry_base_delay: Duration::from_secs(1),
        ..UploadConfig::default()
    }
}

fn twelve_mib_video() -> MemoryFile {
    MemoryFile::new("lecture.mp4", "video/mp4", vec![7u8; 12 * MIB])
}

#[tokio::test]
async fn clean_upload_completes_with_ordered_parts() {
    let gateway = FakeGateway::default();
    let transport = FlakyTransport::default();
    let cancel = CancellationToken::new();
    let file = twelve_mib_video();

    let uploaded = upload_file(&gateway, &transport, &file, &config(), &cancel, &NoProgress)
        .await
        .unwrap();

    assert!(!uploaded.object_url.is_empty());
    assert_eq!(uploaded.file_size, 12 * MIB as u64);
    assert_eq!(gateway.signed_parts(), vec![1, 2, 3]);

    let completions = gateway.completions();
    assert_eq!(completions.len(), 1);
    let (_, parts) = &completions[0];
    assert_eq!(
        parts.iter().map(|p| p.part_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(parts.iter().all(|p| !p.e_tag.is_empty()));
    assert!(gateway.aborts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn flaky_part_recovers_within_retry_budget() {
    let gateway = FakeGateway::default();
    let transport = FlakyTransport::failing(&[(2, 2)]);
    let cancel = CancellationToken::new();
    let file = twelve_mib_video();

    let uploaded = upload_file(&gateway, &transport, &file, &config(), &cancel, &NoProgress)
        .await
        .unwrap();

    assert!(!uploaded.object_url.is_empty());
    assert_eq!(transport.attempts_for(1), 1);
    assert_eq!(transport.attempts_for(2), 3);
    assert_eq!(transport.attempts_for(3), 1);
    assert_eq!(gateway.completions().len(), 1);
    assert!(gateway.aborts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exhausted_part_aborts_the_session() {
    let gateway = FakeGateway::default();
    let transport = FlakyTransport::failing(&[(2, u32::MAX)]);
    let cancel = CancellationToken::new();
    let file = twelve_mib_video();

    let err = upload_file(&gateway, &transport, &file, &config(), &cancel, &NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::PartUploadFailed { part_number: 2 }));
    assert_eq!(transport.attempts_for(2), 3);
    // part 3 is never signed once part 2 gives up
    assert_eq!(gateway.signed_parts(), vec![1, 2]);
    assert!(gateway.completions().is_empty());

    let aborts = gateway.aborts();
    assert_eq!(aborts.len(), 1);
    assert!(aborts[0].starts_with("upload-lecture-"));
}

#[tokio::test]
async fn cancellation_stops_before_the_next_part() {
    let gateway = FakeGateway::default();
    let cancel = CancellationToken::new();
    let transport = FlakyTransport::cancelling_on(2, cancel.clone());
    let file = twelve_mib_video();

    let err = upload_file(&gateway, &transport, &file, &config(), &cancel, &NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Aborted));
    // part 2's PUT was in flight when cancel landed; part 3 never starts
    assert_eq!(gateway.signed_parts(), vec![1, 2]);
    assert_eq!(transport.attempts_for(3), 0);
    assert_eq!(gateway.aborts().len(), 1);
    assert!(gateway.completions().is_empty());
}

#[tokio::test]
async fn progress_starts_after_init_and_ends_at_one_hundred() {
    let gateway = FakeGateway::default();
    let transport = FlakyTransport::default();
    let cancel = CancellationToken::new();
    let sink = RecordingSink::default();
    let file = twelve_mib_video();

    upload_file(&gateway, &transport, &file, &config(), &cancel, &sink)
        .await
        .unwrap();

    let updates = sink.updates.lock().unwrap().clone();
    assert!(updates.len() >= 5);
    assert_eq!(updates.first().unwrap().percent, 5);
    assert_eq!(updates.last().unwrap().percent, 100);
    assert!(
        updates.windows(2).all(|w| w[0].percent <= w[1].percent),
        "progress must never move backwards: {updates:?}"
    );
}

/// Status source that reports in-progress for a fixed number of polls,
/// then completed-and-ready.
struct RampingStatus {
    not_ready_polls: Mutex<u32>,
}

impl StatusSource for RampingStatus {
    async fn processing_status(
        &self,
        file_id: &str,
    ) -> Result<ProcessingStatusResponse, GatewayError> {
        let mut left = self.not_ready_polls.lock().unwrap();
        let ready = *left == 0;
        if !ready {
            *left -= 1;
        }
        Ok(ProcessingStatusResponse {
            success: true,
            file_id: file_id.to_string(),
            processing: ProcessingReport {
                status: if ready {
                    ProcessingPhase::Completed
                } else {
                    ProcessingPhase::InProgress
                },
                hls_files_found: if ready { 6 } else { 1 },
                segment_count: if ready { 5 } else { 0 },
                has_playlist: ready,
            },
            hls: ready.then(|| HlsInfo {
                playlist_url: format!("https://storage.test/hls/{file_id}/index.m3u8"),
                ready: true,
            }),
            metadata: ready.then(|| VideoMetadata {
                duration_seconds: 12.0,
                resolution: "1280x720".to_string(),
                codec: "h264".to_string(),
                bitrate: 2_500_000,
            }),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn controller_runs_the_full_lifecycle() {
    let delivered: Arc<Mutex<Vec<Option<UploadedFile>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = delivered.clone();

    let controller = UploadController::new(
        FakeGateway::default(),
        FlakyTransport::default(),
        config(),
        Arc::new(move |result| sink.lock().unwrap().push(result)),
    );
    let file = twelve_mib_video();

    controller.select_file(&file).await.unwrap();

    let state = controller.state();
    assert_eq!(state.phase, UploadPhase::Success);
    assert_eq!(state.progress_percent, 100);
    assert_eq!(state.total_parts, 3);

    // the parent saw exactly one hand-off, with the finished upload
    let uploaded = {
        let deliveries = delivered.lock().unwrap();
        assert_eq!(deliveries.len(), 1);
        deliveries[0].clone().expect("completion carries the file")
    };
    assert!(uploaded.file_id.starts_with("lecture-"));

    // submit stays blocked until transcoding readiness is observed
    assert!(!controller.submission_allowed());
    let status = RampingStatus {
        not_ready_polls: Mutex::new(2),
    };
    controller
        .watch_processing(&status, &uploaded.file_id, PollOptions::default())
        .await;
    assert!(controller.state().processing_ready);
    assert!(controller.submission_allowed());

    // removing the slot tells the parent to forget the stored result
    controller.remove();
    assert_eq!(controller.state().phase, UploadPhase::Idle);
    assert!(delivered.lock().unwrap().last().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn controller_reports_failure_and_bounds_retry() {
    let controller = UploadController::new(
        FakeGateway::default(),
        FlakyTransport::failing(&[(1, u32::MAX)]),
        config(),
        Arc::new(|_| {}),
    );
    let file = twelve_mib_video();

    controller.select_file(&file).await.unwrap();
    let state = controller.state();
    assert_eq!(state.phase, UploadPhase::Error);
    assert!(state.error.as_deref().unwrap_or("").contains("part 1"));

    // every retry restarts from scratch and is counted
    for expected in 1..=3u32 {
        controller.retry(&file).await;
        let state = controller.state();
        if expected < 3 {
            assert_eq!(state.retry_count, expected);
            assert_eq!(state.phase, UploadPhase::Error);
        }
    }
    // a fourth attempt is refused once the budget is spent
    let spent = controller.state();
    controller.retry(&file).await;
    assert_eq!(controller.state(), spent);
}

#[tokio::test]
async fn controller_rejects_disallowed_content_type() {
    let controller = UploadController::new(
        FakeGateway::default(),
        FlakyTransport::default(),
        config(),
        Arc::new(|_| {}),
    );
    let file = MemoryFile::new("notes.pdf", "application/pdf", vec![0u8; 1024]);

    assert!(controller.select_file(&file).await.is_err());
    assert_eq!(controller.state().phase, UploadPhase::Idle);
}
