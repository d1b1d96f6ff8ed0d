use serde::{Deserialize, Serialize};

/// Published to the `transcoding_tasks` queue when a multipart upload
/// completes. Consumed by the transcoding workers, which write their HLS
/// output under `hls/{file_id}/` and leave metadata in Redis.
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub file_id: String,
    pub s3_key: String,
    pub content_type: String,
}
