use crate::modules::upload::dto::UploadedPart;
use crate::uploader::config::UploadConfig;
use crate::uploader::error::{PartError, PartUploadError};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// One PUT of one byte range to a presigned URL, returning the integrity
/// tag the storage provider answered with.
#[allow(async_fn_in_trait)]
pub trait PartTransport: Send + Sync {
    async fn put_part(&self, url: &str, body: Bytes) -> Result<String, PartError>;
}

#[derive(Clone, Default)]
pub struct HttpPartTransport {
    http: reqwest::Client,
}

impl HttpPartTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartTransport for HttpPartTransport {
    async fn put_part(&self, url: &str, body: Bytes) -> Result<String, PartError> {
        let response = self
            .http
            .put(url)
            .body(body)
            .send()
            .await
            .map_err(|e| PartError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PartError::Status(status.as_u16()));
        }

        // The tag is opaque and handed back verbatim at completion, quotes
        // and all.
        response
            .headers()
            .get("ETag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(PartError::MissingIntegrityTag)
    }
}

/// Upload one part with bounded retries and exponential backoff. The delay
/// before attempt `k` is `retry_base_delay * 2^(k-1)`, with no delay before
/// the first attempt. Cancellation is honored before every attempt and
/// during backoff, and never consumes a retry.
pub async fn upload_part_with_retry<T: PartTransport>(
    transport: &T,
    url: &str,
    body: Bytes,
    part_number: i32,
    config: &UploadConfig,
    cancel: &CancellationToken,
) -> Result<UploadedPart, PartUploadError> {
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(PartUploadError::Aborted { part_number });
        }

        attempt += 1;
        match transport.put_part(url, body.clone()).await {
            Ok(e_tag) => {
                return Ok(UploadedPart {
                    e_tag,
                    part_number,
                });
            }
            Err(err) => {
                warn!(
                    "Part {} attempt {}/{} failed: {}",
                    part_number, attempt, config.max_retries, err
                );
                if attempt >= config.max_retries {
                    return Err(PartUploadError::Exhausted {
                        part_number,
                        attempts: attempt,
                        last: err,
                    });
                }
            }
        }

        // next attempt is `attempt + 1`
        let delay = config.retry_base_delay * 2u32.pow(attempt);
        tokio::select! {
            _ = cancel.cancelled() => return Err(PartUploadError::Aborted { part_number }),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
