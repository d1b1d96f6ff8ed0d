use crate::uploader::config::{UploadConfig, ValidationError, validate_file};
use crate::uploader::gateway::{StatusSource, UploadGateway};
use crate::uploader::orchestrator::{
    ProgressSink, UploadProgress, UploadedFile, chunk_count, upload_file,
};
use crate::uploader::part::PartTransport;
use crate::uploader::poller::{PollOptions, PollOutcome, poll_until_ready};
use crate::uploader::source::FileSource;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Uploading,
    Success,
    Error,
}

/// Everything a widget needs to render one upload slot. Mutated only
/// through [`reduce`], so every observable state is a legal one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadUiState {
    pub phase: UploadPhase,
    pub progress_percent: u8,
    pub current_part: i32,
    pub total_parts: i32,
    pub retry_count: u32,
    pub error: Option<String>,
    /// Transcoding produced a servable playlist.
    pub processing_ready: bool,
    /// The readiness poll gave up; metadata will arrive later.
    pub poll_timed_out: bool,
}

impl UploadUiState {
    pub fn initial() -> Self {
        Self {
            phase: UploadPhase::Idle,
            progress_percent: 0,
            current_part: 0,
            total_parts: 0,
            retry_count: 0,
            error: None,
            processing_ready: false,
            poll_timed_out: false,
        }
    }
}

#[derive(Clone, Debug)]
pub enum UploadUiEvent {
    FileAccepted { total_parts: i32 },
    Progress(UploadProgress),
    Succeeded,
    Failed { message: String },
    Cancelled,
    RetryStarted,
    Removed,
    ProcessingReady,
    ProcessingTimedOut,
}

/// Apply one event to the state. Events that are illegal in the current
/// phase leave the state untouched, as does any progress update that would
/// move the bar backwards.
pub fn reduce(state: &UploadUiState, event: &UploadUiEvent) -> UploadUiState {
    let mut next = state.clone();
    match event {
        UploadUiEvent::FileAccepted { total_parts } => {
            if state.phase == UploadPhase::Idle {
                next = UploadUiState::initial();
                next.phase = UploadPhase::Uploading;
                next.total_parts = *total_parts;
            }
        }
        UploadUiEvent::Progress(update) => {
            if state.phase == UploadPhase::Uploading && update.percent >= state.progress_percent {
                next.progress_percent = update.percent;
                next.current_part = update.current_part;
                next.total_parts = update.total_parts;
            }
        }
        UploadUiEvent::Succeeded => {
            if state.phase == UploadPhase::Uploading {
                next.phase = UploadPhase::Success;
                next.progress_percent = 100;
                next.error = None;
            }
        }
        UploadUiEvent::Failed { message } => {
            if state.phase == UploadPhase::Uploading {
                next.phase = UploadPhase::Error;
                next.error = Some(message.clone());
            }
        }
        UploadUiEvent::Cancelled => {
            if state.phase == UploadPhase::Uploading {
                let retry_count = state.retry_count;
                next = UploadUiState::initial();
                next.retry_count = retry_count;
            }
        }
        UploadUiEvent::RetryStarted => {
            if state.phase == UploadPhase::Error {
                next.phase = UploadPhase::Uploading;
                next.progress_percent = 0;
                next.current_part = 0;
                next.error = None;
                next.retry_count = state.retry_count + 1;
            }
        }
        UploadUiEvent::Removed => {
            if matches!(state.phase, UploadPhase::Success | UploadPhase::Error) {
                next = UploadUiState::initial();
            }
        }
        UploadUiEvent::ProcessingReady => {
            if state.phase == UploadPhase::Success {
                next.processing_ready = true;
            }
        }
        UploadUiEvent::ProcessingTimedOut => {
            if state.phase == UploadPhase::Success {
                next.poll_timed_out = true;
            }
        }
    }
    next
}

/// Hand-off to the owning form. `Some` carries the finished upload, `None`
/// means the slot was cleared and any previously stored result must be
/// dropped.
pub type CompletionCallback = Arc<dyn Fn(Option<UploadedFile>) + Send + Sync>;

struct SharedState(Arc<Mutex<UploadUiState>>);

impl SharedState {
    fn apply(&self, event: UploadUiEvent) {
        let mut state = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *state = reduce(&state, &event);
    }

    fn snapshot(&self) -> UploadUiState {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ProgressSink for SharedState {
    fn report(&self, update: UploadProgress) {
        self.apply(UploadUiEvent::Progress(update));
    }
}

/// Owns one upload slot: validates the file, drives the orchestrator,
/// folds its progress into [`UploadUiState`], and notifies the parent form
/// on completion or removal. Wrap in an `Arc` and call `select_file` /
/// `retry` from a spawned task so `cancel` stays reachable.
pub struct UploadController<G, T> {
    gateway: G,
    transport: T,
    config: UploadConfig,
    state: SharedState,
    cancel: Mutex<CancellationToken>,
    on_complete: CompletionCallback,
}

impl<G, T> UploadController<G, T>
where
    G: UploadGateway,
    T: PartTransport,
{
    pub fn new(gateway: G, transport: T, config: UploadConfig, on_complete: CompletionCallback) -> Self {
        Self {
            gateway,
            transport,
            config,
            state: SharedState(Arc::new(Mutex::new(UploadUiState::initial()))),
            cancel: Mutex::new(CancellationToken::new()),
            on_complete,
        }
    }

    pub fn state(&self) -> UploadUiState {
        self.state.snapshot()
    }

    /// The form may be submitted only once this slot settled: a finished
    /// upload whose transcoding is ready, or whose readiness poll timed
    /// out (metadata then arrives out of band), or an empty slot.
    pub fn submission_allowed(&self) -> bool {
        let state = self.state.snapshot();
        match state.phase {
            UploadPhase::Idle => true,
            UploadPhase::Success => state.processing_ready || state.poll_timed_out,
            UploadPhase::Uploading | UploadPhase::Error => false,
        }
    }

    fn fresh_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(|e| e.into_inner()) = token.clone();
        token
    }

    /// Validate and upload the selected file. Returns the validation
    /// verdict immediately on rejection; otherwise resolves when the
    /// upload settles, with the outcome reflected in the UI state and the
    /// parent callback.
    pub async fn select_file<F: FileSource>(&self, file: &F) -> Result<(), ValidationError> {
        validate_file(file.content_type(), &self.config)?;
        if self.state.snapshot().phase != UploadPhase::Idle {
            return Ok(());
        }

        self.state.apply(UploadUiEvent::FileAccepted {
            total_parts: chunk_count(file.size(), self.config.chunk_size),
        });
        self.run(file).await;
        Ok(())
    }

    /// Signal the running upload to stop. The state flips to idle once the
    /// orchestrator acknowledges and aborts the session.
    pub fn cancel(&self) {
        self.cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();
    }

    /// Start the whole flow over after a failure. A retried upload gets a
    /// fresh file id and session; nothing of the failed attempt is reused.
    pub async fn retry<F: FileSource>(&self, file: &F) {
        let state = self.state.snapshot();
        if state.phase != UploadPhase::Error || state.retry_count >= self.config.max_retries {
            return;
        }

        self.state.apply(UploadUiEvent::RetryStarted);
        self.run(file).await;
    }

    /// Clear the slot and tell the parent to drop any stored result.
    pub fn remove(&self) {
        let state = self.state.snapshot();
        if matches!(state.phase, UploadPhase::Success | UploadPhase::Error) {
            (self.on_complete)(None);
            self.state.apply(UploadUiEvent::Removed);
        }
    }

    /// Watch transcoding readiness for a finished upload, folding the
    /// outcome into the UI state. Shares the controller's cancellation
    /// token so tearing the widget down stops the poll too.
    pub async fn watch_processing<S: StatusSource>(
        &self,
        source: &S,
        file_id: &str,
        opts: PollOptions,
    ) {
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match poll_until_ready(source, file_id, opts, &cancel).await {
            PollOutcome::Ready(_) => self.state.apply(UploadUiEvent::ProcessingReady),
            PollOutcome::TimedOut => self.state.apply(UploadUiEvent::ProcessingTimedOut),
            PollOutcome::Cancelled => {}
        }
    }

    async fn run<F: FileSource>(&self, file: &F) {
        let cancel = self.fresh_token();

        match upload_file(
            &self.gateway,
            &self.transport,
            file,
            &self.config,
            &cancel,
            &self.state,
        )
        .await
        {
            Ok(uploaded) => {
                self.state.apply(UploadUiEvent::Succeeded);
                (self.on_complete)(Some(uploaded));
            }
            Err(err) if err.is_cancellation() => {
                info!("Upload of {} cancelled by the user", file.file_name());
                self.state.apply(UploadUiEvent::Cancelled);
            }
            Err(err) => {
                self.state.apply(UploadUiEvent::Failed {
                    message: err.to_string(),
                });
            }
        }
    }
}
