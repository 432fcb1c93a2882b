use guide_tour::config::BackendConfig;
use guide_tour::progress::{ProgressBackend, progress_routes};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BackendConfig::from_env();

    eprintln!("🧭 Guide Tour progress backend v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Progress API: http://0.0.0.0:{}/api/guide-progress",
        config.port
    );

    let app = axum::Router::new()
        .nest("/api", progress_routes(ProgressBackend::new()))
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "Progress backend listening");
    axum::serve(listener, app).await?;

    Ok(())
}
