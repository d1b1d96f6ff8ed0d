use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

// Wire shapes of the upload gateway. Field names are camelCase on the wire
// (the admin dashboard speaks this contract), `ETag`/`PartNumber` follow the
// storage provider's spelling. Request bodies keep every field optional so
// handlers can answer with the full list of missing fields instead of a
// generic deserialization error; `validated()` converts to the owned shape
// the service layer works with.

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadRequest {
    pub file_name: Option<String>,
    pub file_id: Option<String>,
    pub content_type: Option<String>,
    pub total_chunks: Option<i32>,
}

#[derive(Debug)]
pub struct InitUpload {
    pub file_name: String,
    pub file_id: String,
    pub content_type: String,
    pub total_chunks: i32,
}

impl InitUploadRequest {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.file_name.is_none() {
            missing.push("fileName");
        }
        if self.file_id.is_none() {
            missing.push("fileId");
        }
        if self.content_type.is_none() {
            missing.push("contentType");
        }
        if self.total_chunks.is_none() {
            missing.push("totalChunks");
        }
        missing
    }

    pub fn validated(self) -> Result<InitUpload, Vec<&'static str>> {
        let missing = self.missing_fields();
        if let (Some(file_name), Some(file_id), Some(content_type), Some(total_chunks)) =
            (self.file_name, self.file_id, self.content_type, self.total_chunks)
        {
            Ok(InitUpload {
                file_name,
                file_id,
                content_type,
                total_chunks,
            })
        } else {
            Err(missing)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadResponse {
    pub success: bool,
    pub upload_id: String,
    pub s3_key: String,
    pub file_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignPartQuery {
    pub upload_id: Option<String>,
    pub part_number: Option<i32>,
    pub s3_key: Option<String>,
}

#[derive(Debug)]
pub struct SignPart {
    pub upload_id: String,
    pub part_number: i32,
    pub s3_key: String,
}

impl SignPartQuery {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.upload_id.is_none() {
            missing.push("uploadId");
        }
        if self.part_number.is_none() {
            missing.push("partNumber");
        }
        if self.s3_key.is_none() {
            missing.push("s3Key");
        }
        missing
    }

    pub fn validated(self) -> Result<SignPart, Vec<&'static str>> {
        let missing = self.missing_fields();
        if let (Some(upload_id), Some(part_number), Some(s3_key)) =
            (self.upload_id, self.part_number, self.s3_key)
        {
            Ok(SignPart {
                upload_id,
                part_number,
                s3_key,
            })
        } else {
            Err(missing)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignPartResponse {
    pub success: bool,
    pub presigned_url: String,
}

/// One successfully uploaded byte range: part number plus the integrity tag
/// the storage provider returned for it, carried verbatim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct UploadedPart {
    #[serde(rename = "ETag")]
    pub e_tag: String,
    #[serde(rename = "PartNumber")]
    pub part_number: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadRequest {
    pub upload_id: Option<String>,
    pub s3_key: Option<String>,
    pub parts: Option<Vec<UploadedPart>>,
    pub file_name: Option<String>,
    pub file_id: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Debug)]
pub struct CompleteUpload {
    pub upload_id: String,
    pub s3_key: String,
    pub parts: Vec<UploadedPart>,
    pub file_name: String,
    pub file_id: String,
    pub content_type: String,
}

impl CompleteUploadRequest {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.upload_id.is_none() {
            missing.push("uploadId");
        }
        if self.s3_key.is_none() {
            missing.push("s3Key");
        }
        if self.parts.is_none() {
            missing.push("parts");
        }
        if self.file_name.is_none() {
            missing.push("fileName");
        }
        if self.file_id.is_none() {
            missing.push("fileId");
        }
        if self.content_type.is_none() {
            missing.push("contentType");
        }
        missing
    }

    pub fn validated(self) -> Result<CompleteUpload, Vec<&'static str>> {
        let missing = self.missing_fields();
        if let (
            Some(upload_id),
            Some(s3_key),
            Some(parts),
            Some(file_name),
            Some(file_id),
            Some(content_type),
        ) = (
            self.upload_id,
            self.s3_key,
            self.parts,
            self.file_name,
            self.file_id,
            self.content_type,
        ) {
            Ok(CompleteUpload {
                upload_id,
                s3_key,
                parts,
                file_name,
                file_id,
                content_type,
            })
        } else {
            Err(missing)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadResponse {
    pub success: bool,
    pub s3_url: String,
    pub file_size: i64,
    pub file_name: String,
    pub parts_completed: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AbortUploadRequest {
    pub upload_id: Option<String>,
    pub s3_key: Option<String>,
}

#[derive(Debug)]
pub struct AbortUpload {
    pub upload_id: String,
    pub s3_key: String,
}

impl AbortUploadRequest {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.upload_id.is_none() {
            missing.push("uploadId");
        }
        if self.s3_key.is_none() {
            missing.push("s3Key");
        }
        missing
    }

    pub fn validated(self) -> Result<AbortUpload, Vec<&'static str>> {
        let missing = self.missing_fields();
        if let (Some(upload_id), Some(s3_key)) = (self.upload_id, self.s3_key) {
            Ok(AbortUpload { upload_id, s3_key })
        } else {
            Err(missing)
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AbortUploadResponse {
    pub success: bool,
    pub message: String,
}

/// Transcoding phase as observed through storage output and the
/// transcoder's metadata record. Only ever moves forward.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingPhase {
    Pending,
    InProgress,
    Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingReport {
    pub status: ProcessingPhase,
    pub hls_files_found: usize,
    pub segment_count: usize,
    pub has_playlist: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HlsInfo {
    pub playlist_url: String,
    pub ready: bool,
}

/// Final stream metadata, written by the transcoder once it finishes.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub duration_seconds: f64,
    pub resolution: String,
    pub codec: String,
    pub bitrate: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatusResponse {
    pub success: bool,
    pub file_id: String,
    pub processing: ProcessingReport,
    pub hls: Option<HlsInfo>,
    pub metadata: Option<VideoMetadata>,
}

impl ProcessingStatusResponse {
    /// Transcoding is done and the playlist is servable.
    pub fn is_ready(&self) -> bool {
        self.processing.status == ProcessingPhase::Completed
            && self.hls.as_ref().is_some_and(|h| h.ready)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadedChunk {
    pub key: String,
    pub size: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatusResponse {
    pub success: bool,
    pub file_id: String,
    pub chunks: Vec<UploadedChunk>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfoResponse {
    pub success: bool,
    pub file_id: String,
    pub playlist_url: String,
    pub segments: Vec<String>,
    pub segment_count: usize,
    pub ready: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_request_reports_every_missing_field() {
        let req = InitUploadRequest {
            file_name: Some("movie.mp4".to_string()),
            file_id: None,
            content_type: None,
            total_chunks: Some(3),
        };
        assert_eq!(req.missing_fields(), vec!["fileId", "contentType"]);
        assert!(req.validated().is_err());
    }

    #[test]
    fn uploaded_part_uses_provider_field_names() {
        let part = UploadedPart {
            e_tag: "\"abc123\"".to_string(),
            part_number: 2,
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["ETag"], "\"abc123\"");
        assert_eq!(json["PartNumber"], 2);
    }

    #[test]
    fn readiness_requires_completed_phase_and_ready_playlist() {
        let mut status = ProcessingStatusResponse {
            success: true,
            file_id: "f".to_string(),
            processing: ProcessingReport {
                status: ProcessingPhase::Completed,
                hls_files_found: 5,
                segment_count: 4,
                has_playlist: true,
            },
            hls: Some(HlsInfo {
                playlist_url: "u".to_string(),
                ready: true,
            }),
            metadata: None,
        };
        assert!(status.is_ready());

        status.processing.status = ProcessingPhase::InProgress;
        assert!(!status.is_ready());

        status.processing.status = ProcessingPhase::Completed;
        status.hls = None;
        assert!(!status.is_ready());
    }
}
