use crate::docs::ApiDoc;
use crate::state::AppState;
use axum::Router;
use axum::http::Method;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;

pub fn configure_routes() -> Router<AppState> {
    // The admin dashboard uploads straight from the browser, so every
    // endpoint must answer CORS preflights for its verbs.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", crate::modules::upload::router())
        .route("/health", axum::routing::get(|| async { "ok" }))
        // Gateway bodies are JSON control messages; file bytes go straight
        // to storage via presigned URLs and never pass through here.
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(cors)
}
