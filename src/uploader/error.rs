use crate::uploader::gateway::GatewayError;
use thiserror::Error;

/// Failure of a single PUT attempt against a presigned URL.
#[derive(Debug, Error)]
pub enum PartError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("storage returned status {0}")]
    Status(u16),
    #[error("response carried no ETag header")]
    MissingIntegrityTag,
}

/// Terminal outcome of one part after the retry loop.
#[derive(Debug, Error)]
pub enum PartUploadError {
    #[error("part {part_number} upload cancelled")]
    Aborted { part_number: i32 },
    #[error("part {part_number} failed after {attempts} attempts: {last}")]
    Exhausted {
        part_number: i32,
        attempts: u32,
        #[source]
        last: PartError,
    },
}

/// Terminal outcome of a whole upload orchestration. Never leaks panics or
/// provider-specific errors past this boundary.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload initialization failed: {0}")]
    InitializationFailed(#[source] GatewayError),
    #[error("failed to read part {part_number} from the source file: {source}")]
    SourceRead {
        part_number: i32,
        #[source]
        source: std::io::Error,
    },
    #[error("part {part_number} exhausted its retry budget")]
    PartUploadFailed { part_number: i32 },
    #[error("completing the upload was rejected: {0}")]
    CompletionFailed(#[source] GatewayError),
    #[error("upload cancelled")]
    Aborted,
}

impl UploadError {
    /// User-initiated cancellation is not an error for telemetry purposes.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, UploadError::Aborted)
    }
}
