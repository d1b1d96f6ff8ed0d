use crate::modules::upload::dto::ProcessingStatusResponse;
use crate::uploader::gateway::StatusSource;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug)]
pub struct PollOptions {
    /// Wall-clock ceiling for the whole polling run.
    pub timeout: Duration,
    /// Delay between consecutive status requests.
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            interval: Duration::from_secs(3),
        }
    }
}

#[derive(Debug)]
pub enum PollOutcome {
    /// Transcoding finished and the playlist is servable; carries the final
    /// status snapshot, handed to the caller exactly once.
    Ready(ProcessingStatusResponse),
    /// The ceiling elapsed first. Not an error: transcoding may simply be
    /// slow, the caller stays in a "still processing" state.
    TimedOut,
    /// The owning widget went away.
    Cancelled,
}

/// Poll the processing status until readiness, timeout, or cancellation.
/// The first request goes out immediately, then one per interval. A failed
/// poll is transient: logged and retried on the next tick.
pub async fn poll_until_ready<S: StatusSource>(
    source: &S,
    file_id: &str,
    opts: PollOptions,
    cancel: &CancellationToken,
) -> PollOutcome {
    let started = Instant::now();

    loop {
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }

        match source.processing_status(file_id).await {
            Ok(status) if status.is_ready() => {
                debug!("Processing of {} is ready", file_id);
                return PollOutcome::Ready(status);
            }
            Ok(status) => {
                debug!(
                    "Processing of {} still {:?} ({} segments)",
                    file_id, status.processing.status, status.processing.segment_count
                );
            }
            Err(e) => {
                warn!("Processing status poll for {} failed: {}", file_id, e);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            _ = tokio::time::sleep(opts.interval) => {}
        }

        if started.elapsed() >= opts.timeout {
            debug!("Gave up polling {} after {:?}", file_id, opts.timeout);
            return PollOutcome::TimedOut;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::upload::dto::{
        HlsInfo, ProcessingPhase, ProcessingReport, VideoMetadata,
    };
    use crate::uploader::gateway::GatewayError;
    use std::sync::Mutex;

    fn status(phase: ProcessingPhase, ready: bool) -> ProcessingStatusResponse {
        ProcessingStatusResponse {
            success: true,
            file_id: "file-1".to_string(),
            processing: ProcessingReport {
                status: phase,
                hls_files_found: if ready { 5 } else { 0 },
                segment_count: if ready { 4 } else { 0 },
                has_playlist: ready,
            },
            hls: ready.then(|| HlsInfo {
                playlist_url: "https://storage/hls/file-1/index.m3u8".to_string(),
                ready: true,
            }),
            metadata: ready.then(|| VideoMetadata {
                duration_seconds: 61.5,
                resolution: "1920x1080".to_string(),
                codec: "h264".to_string(),
                bitrate: 4_000_000,
            }),
        }
    }

    struct ScriptedSource {
        responses: Mutex<Vec<Result<ProcessingStatusResponse, GatewayError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<ProcessingStatusResponse, GatewayError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl StatusSource for ScriptedSource {
        async fn processing_status(
            &self,
            _file_id: &str,
        ) -> Result<ProcessingStatusResponse, GatewayError> {
            *self.calls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                // keep serving "in progress" forever
                return Ok(status(ProcessingPhase::InProgress, false));
            }
            responses.remove(0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ready_on_third_poll_stops_the_loop() {
        let source = ScriptedSource::new(vec![
            Ok(status(ProcessingPhase::InProgress, false)),
            Ok(status(ProcessingPhase::InProgress, false)),
            Ok(status(ProcessingPhase::Completed, true)),
        ]);
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let outcome = poll_until_ready(&source, "file-1", PollOptions::default(), &cancel).await;

        match outcome {
            PollOutcome::Ready(status) => {
                assert!(status.is_ready());
                assert!(status.metadata.is_some());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(source.calls(), 3);
        // polls at t=0s, 3s, 6s
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_silently_after_forty_polls() {
        let source = ScriptedSource::new(vec![]);
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let outcome = poll_until_ready(&source, "file-1", PollOptions::default(), &cancel).await;

        assert!(matches!(outcome, PollOutcome::TimedOut));
        assert_eq!(source.calls(), 40);
        assert_eq!(started.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_do_not_stop_polling() {
        let source = ScriptedSource::new(vec![
            Err(GatewayError::Rejected {
                status: 502,
                message: "bad gateway".to_string(),
            }),
            Ok(status(ProcessingPhase::Completed, true)),
        ]);
        let cancel = CancellationToken::new();

        let outcome = poll_until_ready(&source, "file-1", PollOptions::default(), &cancel).await;

        assert!(matches!(outcome, PollOutcome::Ready(_)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop() {
        let source = ScriptedSource::new(vec![]);
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(4)).await;
            cancel_clone.cancel();
        });

        let outcome = poll_until_ready(&source, "file-1", PollOptions::default(), &cancel).await;

        assert!(matches!(outcome, PollOutcome::Cancelled));
        // only the t=0s and t=3s polls ran
        assert_eq!(source.calls(), 2);
    }
}
