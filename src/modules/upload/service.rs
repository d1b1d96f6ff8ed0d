use super::dto::{
    AbortUpload, CompleteUpload, CompleteUploadResponse, HlsInfo, InitUpload, InitUploadResponse,
    ProcessingPhase, ProcessingReport, ProcessingStatusResponse, SignPart, SignPartResponse,
    UploadStatusResponse, UploadedChunk, VideoInfoResponse, VideoMetadata,
};
use super::events::TranscodeJob;
use crate::infrastructure::queue::rabbitmq::TRANSCODING_QUEUE;
use crate::state::AppState;
use anyhow::Result;
use aws_sdk_s3::types::CompletedPart;
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{info, warn};

fn hls_prefix(file_id: &str) -> String {
    format!("hls/{}/", file_id)
}

fn metadata_key(file_id: &str) -> String {
    format!("processing:{}:metadata", file_id)
}

pub struct UploadService;

impl UploadService {
    /// Open a multipart session and derive the object key the whole session
    /// will live under.
    pub async fn initialize(state: AppState, req: InitUpload) -> Result<InitUploadResponse> {
        let extension = Path::new(&req.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let s3_key = format!(
            "uploads/{}_{}.{}",
            req.file_id,
            OffsetDateTime::now_utc().unix_timestamp(),
            extension
        );

        let upload_id = state
            .storage
            .create_multipart_upload(&s3_key, &req.content_type)
            .await?;

        info!(
            "Initialized multipart upload {} ({} parts) -> {}",
            req.file_id, req.total_chunks, s3_key
        );

        Ok(InitUploadResponse {
            success: true,
            upload_id,
            s3_key,
            file_name: req.file_name,
        })
    }

    pub async fn sign_part(state: AppState, req: SignPart) -> Result<SignPartResponse> {
        let expiry = Duration::from_secs(state.config.presign_expiry_secs);
        let presigned_url = state
            .storage
            .presign_upload_part(&req.s3_key, &req.upload_id, req.part_number, expiry)
            .await?;

        Ok(SignPartResponse {
            success: true,
            presigned_url,
        })
    }

    /// Finalize the session. Parts are sorted by part number here no matter
    /// which order the client collected them in.
    pub async fn complete(state: AppState, req: CompleteUpload) -> Result<CompleteUploadResponse> {
        let CompleteUpload {
            upload_id,
            s3_key,
            mut parts,
            file_name,
            file_id,
            content_type,
        } = req;

        parts.sort_by_key(|p| p.part_number);
        let parts_completed = parts.len();

        let completed = parts
            .into_iter()
            .map(|p| {
                CompletedPart::builder()
                    .e_tag(p.e_tag)
                    .part_number(p.part_number)
                    .build()
            })
            .collect();

        let s3_url = state
            .storage
            .complete_multipart_upload(&s3_key, &upload_id, completed)
            .await?;

        let file_size = state.storage.object_size(&s3_key).await?;

        // Hand off to the transcoding workers. The upload itself is already
        // durable, so a queue hiccup is logged rather than failing the call.
        let job = TranscodeJob {
            file_id: file_id.clone(),
            s3_key: s3_key.clone(),
            content_type,
        };
        match serde_json::to_vec(&job) {
            Ok(payload) => {
                if let Err(e) = state.queue.publish(TRANSCODING_QUEUE, &payload).await {
                    warn!("Failed to enqueue transcode job for {}: {}", file_id, e);
                }
            }
            Err(e) => warn!("Failed to serialize transcode job for {}: {}", file_id, e),
        }

        info!(
            "Completed multipart upload {} ({} parts, {} bytes)",
            file_id, parts_completed, file_size
        );

        Ok(CompleteUploadResponse {
            success: true,
            s3_url,
            file_size,
            file_name,
            parts_completed,
        })
    }

    pub async fn abort(state: AppState, req: AbortUpload) -> Result<()> {
        state
            .storage
            .abort_multipart_upload(&req.s3_key, &req.upload_id)
            .await?;
        info!("Aborted multipart upload {} for {}", req.upload_id, req.s3_key);
        Ok(())
    }

    /// Derive the transcoding status from what is observable: HLS output
    /// listed from storage plus the metadata record the transcoder leaves in
    /// Redis when it finishes.
    pub async fn processing_status(
        state: AppState,
        file_id: String,
    ) -> Result<ProcessingStatusResponse> {
        let listing = state.storage.list_objects(&hls_prefix(&file_id)).await?;

        let segment_count = listing.iter().filter(|o| o.key.ends_with(".ts")).count();
        let playlist = listing.iter().find(|o| o.key.ends_with(".m3u8"));
        let has_playlist = playlist.is_some();

        let metadata: Option<VideoMetadata> = state.redis.get_json(&metadata_key(&file_id)).await?;

        let status = if has_playlist && segment_count > 0 && metadata.is_some() {
            ProcessingPhase::Completed
        } else if listing.is_empty() && metadata.is_none() {
            ProcessingPhase::Pending
        } else {
            ProcessingPhase::InProgress
        };

        let hls = match playlist {
            Some(obj) => {
                let expiry = Duration::from_secs(state.config.presign_expiry_secs);
                let playlist_url = state.storage.presign_get(&obj.key, expiry).await?;
                Some(HlsInfo {
                    playlist_url,
                    ready: has_playlist && segment_count > 0,
                })
            }
            None => None,
        };

        Ok(ProcessingStatusResponse {
            success: true,
            file_id,
            processing: ProcessingReport {
                status,
                hls_files_found: listing.len(),
                segment_count,
                has_playlist,
            },
            hls,
            metadata,
        })
    }

    /// Diagnostic view of the raw uploaded objects for a file id.
    pub async fn upload_status(state: AppState, file_id: String) -> Result<UploadStatusResponse> {
        let prefix = format!("uploads/{}", file_id);
        let listing = state.storage.list_objects(&prefix).await?;

        let chunks = listing
            .into_iter()
            .map(|o| UploadedChunk {
                key: o.key,
                size: o.size,
                last_modified: o.last_modified,
            })
            .collect();

        Ok(UploadStatusResponse {
            success: true,
            file_id,
            chunks,
        })
    }

    /// Resolved playlist and segment URLs once HLS output exists. `None`
    /// while the transcoder has not produced a playlist yet.
    pub async fn video_info(
        state: AppState,
        file_id: String,
    ) -> Result<Option<VideoInfoResponse>> {
        let listing = state.storage.list_objects(&hls_prefix(&file_id)).await?;

        let Some(playlist) = listing.iter().find(|o| o.key.ends_with(".m3u8")) else {
            return Ok(None);
        };

        let expiry = Duration::from_secs(state.config.presign_expiry_secs);
        let playlist_url = state.storage.presign_get(&playlist.key, expiry).await?;

        let mut segment_keys: Vec<&str> = listing
            .iter()
            .filter(|o| o.key.ends_with(".ts"))
            .map(|o| o.key.as_str())
            .collect();
        segment_keys.sort_unstable();

        let mut segments = Vec::with_capacity(segment_keys.len());
        for key in &segment_keys {
            segments.push(state.storage.presign_get(key, expiry).await?);
        }

        let segment_count = segments.len();
        Ok(Some(VideoInfoResponse {
            success: true,
            file_id,
            playlist_url,
            segments,
            segment_count,
            ready: segment_count > 0,
        }))
    }
}
