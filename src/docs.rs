use crate::common::response::ErrorBody;
use crate::modules::upload::dto::*;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::upload::handler::initialize_upload,
        crate::modules::upload::handler::sign_part,
        crate::modules::upload::handler::complete_upload,
        crate::modules::upload::handler::abort_upload,
        crate::modules::upload::handler::processing_status,
        crate::modules::upload::handler::upload_status,
        crate::modules::upload::handler::video_info,
    ),
    components(
        schemas(
            ErrorBody,
            InitUploadRequest, InitUploadResponse,
            SignPartQuery, SignPartResponse,
            UploadedPart, CompleteUploadRequest, CompleteUploadResponse,
            AbortUploadRequest, AbortUploadResponse,
            ProcessingPhase, ProcessingReport, HlsInfo, VideoMetadata,
            ProcessingStatusResponse,
            UploadedChunk, UploadStatusResponse,
            VideoInfoResponse,
        )
    ),
    tags(
        (name = "Upload", description = "Resumable multipart upload gateway")
    )
)]
pub struct ApiDoc;
