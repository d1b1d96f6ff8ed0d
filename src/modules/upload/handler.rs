use crate::common::response::ApiError;
use crate::modules::upload::dto::*;
use crate::modules::upload::service::UploadService;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

fn missing_fields_error(missing: Vec<&'static str>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "Missing required fields")
        .with_detail(missing.join(", "))
}

/// Initialize a multipart upload session
#[utoipa::path(
    post,
    path = "/api/upload-presign",
    request_body = InitUploadRequest,
    responses(
        (status = 200, description = "Session initialized", body = InitUploadResponse),
        (status = 400, description = "Missing required fields", body = crate::common::response::ErrorBody),
        (status = 500, description = "Storage provider error", body = crate::common::response::ErrorBody)
    ),
    tag = "Upload"
)]
pub async fn initialize_upload(
    State(state): State<AppState>,
    Json(req): Json<InitUploadRequest>,
) -> impl IntoResponse {
    let req = match req.validated() {
        Ok(req) => req,
        Err(missing) => return missing_fields_error(missing).into_response(),
    };

    match UploadService::initialize(state, req).await {
        Ok(res) => (StatusCode::OK, Json(res)).into_response(),
        Err(e) => ApiError::internal("Failed to initialize upload")
            .with_detail(e.to_string())
            .into_response(),
    }
}

/// Presign a single part upload
#[utoipa::path(
    get,
    path = "/api/upload-presign",
    params(
        ("uploadId" = String, Query, description = "Multipart session id"),
        ("partNumber" = i32, Query, description = "1-based part number"),
        ("s3Key" = String, Query, description = "Object key of the session")
    ),
    responses(
        (status = 200, description = "Presigned URL for one part PUT", body = SignPartResponse),
        (status = 400, description = "Missing required fields", body = crate::common::response::ErrorBody),
        (status = 500, description = "Storage provider error", body = crate::common::response::ErrorBody)
    ),
    tag = "Upload"
)]
pub async fn sign_part(
    State(state): State<AppState>,
    Query(query): Query<SignPartQuery>,
) -> impl IntoResponse {
    let req = match query.validated() {
        Ok(req) => req,
        Err(missing) => return missing_fields_error(missing).into_response(),
    };

    match UploadService::sign_part(state, req).await {
        Ok(res) => (StatusCode::OK, Json(res)).into_response(),
        Err(e) => ApiError::internal("Failed to presign part")
            .with_detail(e.to_string())
            .into_response(),
    }
}

/// Complete a multipart upload
#[utoipa::path(
    post,
    path = "/api/complete-upload",
    request_body = CompleteUploadRequest,
    responses(
        (status = 200, description = "Upload finalized", body = CompleteUploadResponse),
        (status = 400, description = "Missing required fields", body = crate::common::response::ErrorBody),
        (status = 500, description = "Storage provider error", body = crate::common::response::ErrorBody)
    ),
    tag = "Upload"
)]
pub async fn complete_upload(
    State(state): State<AppState>,
    Json(req): Json<CompleteUploadRequest>,
) -> impl IntoResponse {
    let req = match req.validated() {
        Ok(req) => req,
        Err(missing) => return missing_fields_error(missing).into_response(),
    };

    match UploadService::complete(state, req).await {
        Ok(res) => (StatusCode::OK, Json(res)).into_response(),
        Err(e) => ApiError::internal("Failed to complete upload")
            .with_detail(e.to_string())
            .into_response(),
    }
}

/// Abort a multipart upload, releasing reserved storage
#[utoipa::path(
    post,
    path = "/api/abort-upload",
    request_body = AbortUploadRequest,
    responses(
        (status = 200, description = "Session aborted", body = AbortUploadResponse),
        (status = 400, description = "Missing required fields", body = crate::common::response::ErrorBody),
        (status = 500, description = "Storage provider error", body = crate::common::response::ErrorBody)
    ),
    tag = "Upload"
)]
pub async fn abort_upload(
    State(state): State<AppState>,
    Json(req): Json<AbortUploadRequest>,
) -> impl IntoResponse {
    let req = match req.validated() {
        Ok(req) => req,
        Err(missing) => return missing_fields_error(missing).into_response(),
    };

    match UploadService::abort(state, req).await {
        Ok(()) => (
            StatusCode::OK,
            Json(AbortUploadResponse {
                success: true,
                message: "Upload aborted".to_string(),
            }),
        )
            .into_response(),
        Err(e) => ApiError::internal("Failed to abort upload")
            .with_detail(e.to_string())
            .into_response(),
    }
}

/// Transcoding status for an uploaded file
#[utoipa::path(
    get,
    path = "/api/processing-status/{file_id}",
    params(("file_id" = String, Path, description = "Client-generated file id")),
    responses(
        (status = 200, description = "Current processing state", body = ProcessingStatusResponse),
        (status = 500, description = "Storage provider error", body = crate::common::response::ErrorBody)
    ),
    tag = "Upload"
)]
pub async fn processing_status(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> impl IntoResponse {
    match UploadService::processing_status(state, file_id).await {
        Ok(res) => (StatusCode::OK, Json(res)).into_response(),
        Err(e) => ApiError::internal("Failed to read processing status")
            .with_detail(e.to_string())
            .into_response(),
    }
}

/// Diagnostic listing of uploaded objects for a file id
#[utoipa::path(
    get,
    path = "/api/upload-status/{file_id}",
    params(("file_id" = String, Path, description = "Client-generated file id")),
    responses(
        (status = 200, description = "Uploaded objects", body = UploadStatusResponse),
        (status = 500, description = "Storage provider error", body = crate::common::response::ErrorBody)
    ),
    tag = "Upload"
)]
pub async fn upload_status(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> impl IntoResponse {
    match UploadService::upload_status(state, file_id).await {
        Ok(res) => (StatusCode::OK, Json(res)).into_response(),
        Err(e) => ApiError::internal("Failed to list uploaded objects")
            .with_detail(e.to_string())
            .into_response(),
    }
}

/// Resolved HLS playlist and segment URLs once transcoding is done
#[utoipa::path(
    get,
    path = "/api/video-info/{file_id}",
    params(("file_id" = String, Path, description = "Client-generated file id")),
    responses(
        (status = 200, description = "Playable HLS URLs", body = VideoInfoResponse),
        (status = 404, description = "HLS output not ready", body = crate::common::response::ErrorBody),
        (status = 500, description = "Storage provider error", body = crate::common::response::ErrorBody)
    ),
    tag = "Upload"
)]
pub async fn video_info(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> impl IntoResponse {
    match UploadService::video_info(state, file_id).await {
        Ok(Some(res)) => (StatusCode::OK, Json(res)).into_response(),
        Ok(None) => ApiError::new(StatusCode::NOT_FOUND, "HLS output not ready").into_response(),
        Err(e) => ApiError::internal("Failed to resolve video info")
            .with_detail(e.to_string())
            .into_response(),
    }
}
