use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vod_backend::config::settings::AppConfig;
use vod_backend::infrastructure::queue::rabbitmq::RabbitMqService;
use vod_backend::infrastructure::redis::client::RedisService;
use vod_backend::infrastructure::storage::s3::StorageService;
use vod_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting upload gateway...");

    let config = AppConfig::new()?;

    let storage = StorageService::new(
        &config.minio_url,
        &config.minio_bucket,
        &config.minio_access_key,
        &config.minio_secret_key,
    )
    .await;
    let redis = RedisService::new(&config.redis_url).await?;
    let queue = RabbitMqService::new(&config.amqp_url).await?;

    let port = config.server_port;
    let state = AppState::new(config, storage, redis, queue);

    let app = vod_backend::app::create_app(state).await;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
