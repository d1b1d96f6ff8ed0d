use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};

pub mod dto;
pub mod events;
pub mod handler;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/upload-presign",
            post(handler::initialize_upload).get(handler::sign_part),
        )
        .route("/complete-upload", post(handler::complete_upload))
        .route("/abort-upload", post(handler::abort_upload))
        .route("/processing-status/{file_id}", get(handler::processing_status))
        .route("/upload-status/{file_id}", get(handler::upload_status))
        .route("/video-info/{file_id}", get(handler::video_info))
}
