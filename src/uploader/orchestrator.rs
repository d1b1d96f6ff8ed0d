use crate::modules::upload::dto::UploadedPart;
use crate::uploader::config::UploadConfig;
use crate::uploader::error::{PartUploadError, UploadError};
use crate::uploader::gateway::{CompleteUploadBody, InitUploadBody, UploadGateway};
use crate::uploader::part::{PartTransport, upload_part_with_retry};
use crate::uploader::source::FileSource;
use std::ops::Range;
use std::path::Path;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Progress events emitted while an upload runs. Percent is monotonic
/// within one attempt: 5 after initialization, 5..=90 through the part
/// loop, 95 before completion, 100 on success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadProgress {
    pub percent: u8,
    pub current_part: i32,
    pub total_parts: i32,
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, update: UploadProgress);
}

/// Ignore progress entirely.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _update: UploadProgress) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Uploading,
    Completed,
    Aborted,
    Failed,
}

/// One file's journey through a multipart session. The orchestrator owns
/// this exclusively for the lifetime of the attempt.
#[derive(Debug)]
pub struct UploadSession {
    pub file_id: String,
    pub upload_id: String,
    pub s3_key: String,
    pub content_type: String,
    pub total_parts: i32,
    pub parts_completed: Vec<UploadedPart>,
    pub status: SessionStatus,
}

impl UploadSession {
    fn record_part(&mut self, part: UploadedPart) {
        debug_assert!(part.part_number >= 1 && part.part_number <= self.total_parts);
        debug_assert!(
            !self
                .parts_completed
                .iter()
                .any(|p| p.part_number == part.part_number)
        );
        self.parts_completed.push(part);
    }

    fn is_complete(&self) -> bool {
        self.parts_completed.len() == self.total_parts as usize
    }
}

/// Successful upload hand-off to the surrounding form.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub file_id: String,
    pub s3_key: String,
    pub file_size: u64,
    pub content_type: String,
    pub object_url: String,
}

/// Number of parts needed to cover `file_size` bytes.
pub fn chunk_count(file_size: u64, chunk_size: u64) -> i32 {
    file_size.div_ceil(chunk_size) as i32
}

/// Half-open byte range of one part. Ranges tile `[0, file_size)` exactly.
pub fn part_range(part_number: i32, chunk_size: u64, file_size: u64) -> Range<u64> {
    let start = (part_number as u64 - 1) * chunk_size;
    let end = (start + chunk_size).min(file_size);
    start..end
}

/// Unique per upload attempt: sanitized file stem, timestamp, random
/// suffix.
pub fn generate_file_id(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let slug: String = stem
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    let suffix = Uuid::new_v4().as_simple().to_string();

    format!(
        "{}-{}-{}",
        if slug.is_empty() { "upload" } else { slug },
        OffsetDateTime::now_utc().unix_timestamp(),
        &suffix[..6]
    )
}

async fn abort_best_effort<G: UploadGateway>(gateway: &G, upload_id: &str, s3_key: &str) {
    if let Err(e) = gateway.abort(upload_id, s3_key).await {
        warn!("Best-effort abort of upload {} failed: {}", upload_id, e);
    }
}

fn part_progress(part_number: i32, total_parts: i32) -> u8 {
    5 + (85.0 * part_number as f64 / total_parts as f64).round() as u8
}

/// Drive one file through the full multipart lifecycle: initialize, upload
/// every part sequentially with retry, then complete. Any failure after a
/// session exists triggers a best-effort abort so the provider can release
/// the reserved storage.
pub async fn upload_file<G, T, F, P>(
    gateway: &G,
    transport: &T,
    file: &F,
    config: &UploadConfig,
    cancel: &CancellationToken,
    progress: &P,
) -> Result<UploadedFile, UploadError>
where
    G: UploadGateway,
    T: PartTransport,
    F: FileSource,
    P: ProgressSink,
{
    let total_parts = chunk_count(file.size(), config.chunk_size);
    let file_id = generate_file_id(file.file_name());

    let init = gateway
        .initialize(&InitUploadBody {
            file_name: file.file_name().to_string(),
            file_id: file_id.clone(),
            content_type: file.content_type().to_string(),
            total_chunks: total_parts,
        })
        .await
        .map_err(UploadError::InitializationFailed)?;

    let mut session = UploadSession {
        file_id,
        upload_id: init.upload_id,
        s3_key: init.s3_key,
        content_type: file.content_type().to_string(),
        total_parts,
        parts_completed: Vec::with_capacity(total_parts as usize),
        status: SessionStatus::Uploading,
    };

    info!(
        "Upload {} started: {} parts of at most {} bytes",
        session.file_id, total_parts, config.chunk_size
    );

    // Transport has begun; give the progress bar its first nudge.
    progress.report(UploadProgress {
        percent: 5,
        current_part: 0,
        total_parts,
    });

    for part_number in 1..=total_parts {
        if cancel.is_cancelled() {
            session.status = SessionStatus::Aborted;
            abort_best_effort(gateway, &session.upload_id, &session.s3_key).await;
            return Err(UploadError::Aborted);
        }

        let range = part_range(part_number, config.chunk_size, file.size());
        let bytes = match file.read_range(range).await {
            Ok(bytes) => bytes,
            Err(source) => {
                session.status = SessionStatus::Failed;
                abort_best_effort(gateway, &session.upload_id, &session.s3_key).await;
                return Err(UploadError::SourceRead {
                    part_number,
                    source,
                });
            }
        };

        let url = match gateway
            .sign_part(&session.upload_id, part_number, &session.s3_key)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    "Signing part {} of upload {} failed: {}",
                    part_number, session.file_id, e
                );
                session.status = SessionStatus::Failed;
                abort_best_effort(gateway, &session.upload_id, &session.s3_key).await;
                return Err(UploadError::PartUploadFailed { part_number });
            }
        };

        match upload_part_with_retry(transport, &url, bytes, part_number, config, cancel).await {
            Ok(part) => {
                session.record_part(part);
                progress.report(UploadProgress {
                    percent: part_progress(part_number, total_parts),
                    current_part: part_number,
                    total_parts,
                });
            }
            Err(PartUploadError::Aborted { .. }) => {
                session.status = SessionStatus::Aborted;
                abort_best_effort(gateway, &session.upload_id, &session.s3_key).await;
                return Err(UploadError::Aborted);
            }
            Err(PartUploadError::Exhausted { part_number, .. }) => {
                session.status = SessionStatus::Failed;
                abort_best_effort(gateway, &session.upload_id, &session.s3_key).await;
                return Err(UploadError::PartUploadFailed { part_number });
            }
        }
    }

    debug_assert!(session.is_complete());
    progress.report(UploadProgress {
        percent: 95,
        current_part: total_parts,
        total_parts,
    });

    // Completion wants parts ordered by part number, whatever order their
    // uploads resolved in.
    session.parts_completed.sort_by_key(|p| p.part_number);

    let completed = match gateway
        .complete(&CompleteUploadBody {
            upload_id: session.upload_id.clone(),
            s3_key: session.s3_key.clone(),
            parts: session.parts_completed.clone(),
            file_name: file.file_name().to_string(),
            file_id: session.file_id.clone(),
            content_type: session.content_type.clone(),
        })
        .await
    {
        Ok(completed) => completed,
        Err(e) => {
            session.status = SessionStatus::Failed;
            abort_best_effort(gateway, &session.upload_id, &session.s3_key).await;
            return Err(UploadError::CompletionFailed(e));
        }
    };

    session.status = SessionStatus::Completed;
    progress.report(UploadProgress {
        percent: 100,
        current_part: total_parts,
        total_parts,
    });

    info!(
        "Upload {} completed: {} bytes at {}",
        session.file_id, completed.file_size, completed.s3_url
    );

    Ok(UploadedFile {
        file_id: session.file_id,
        s3_key: session.s3_key,
        file_size: completed.file_size.max(0) as u64,
        content_type: session.content_type,
        object_url: completed.s3_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn chunk_count_matches_ceiling_division() {
        assert_eq!(chunk_count(12 * MIB, 5 * MIB), 3);
        assert_eq!(chunk_count(10 * MIB, 5 * MIB), 2);
        assert_eq!(chunk_count(1, 5 * MIB), 1);
        assert_eq!(chunk_count(5 * MIB, 5 * MIB), 1);
        assert_eq!(chunk_count(5 * MIB + 1, 5 * MIB), 2);
    }

    #[test]
    fn part_ranges_tile_the_file_exactly() {
        for &(size, chunk) in &[
            (12 * MIB, 5 * MIB),
            (5 * MIB, 5 * MIB),
            (1u64, 5 * MIB),
            (17 * MIB + 3, 5 * MIB),
            (99, 7u64),
        ] {
            let total = chunk_count(size, chunk);
            let mut covered = 0u64;
            for part in 1..=total {
                let range = part_range(part, chunk, size);
                assert_eq!(range.start, covered, "gap or overlap before part {part}");
                assert!(range.end > range.start);
                assert!(range.end - range.start <= chunk);
                covered = range.end;
            }
            assert_eq!(covered, size, "ranges must cover the whole file");
        }
    }

    #[test]
    fn twelve_mib_file_splits_into_expected_ranges() {
        let size = 12 * MIB;
        let chunk = 5 * MIB;
        assert_eq!(chunk_count(size, chunk), 3);
        assert_eq!(part_range(1, chunk, size), 0..5 * MIB);
        assert_eq!(part_range(2, chunk, size), 5 * MIB..10 * MIB);
        assert_eq!(part_range(3, chunk, size), 10 * MIB..12 * MIB);
    }

    #[test]
    fn file_id_is_sanitized_and_unique() {
        let a = generate_file_id("My Movie (Final).mp4");
        let b = generate_file_id("My Movie (Final).mp4");
        assert!(a.starts_with("my-movie--final-"));
        assert_ne!(a, b, "random suffix must differ between attempts");
        assert!(!generate_file_id("....").is_empty());
    }

    #[test]
    fn progress_is_monotonic_over_the_part_loop() {
        for total in [1, 2, 3, 7, 40] {
            let mut last = 5;
            for part in 1..=total {
                let percent = part_progress(part, total);
                assert!(percent >= last);
                last = percent;
            }
            assert_eq!(part_progress(total, total), 90);
        }
    }
}
