use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forvo_relay::{
    api,
    config::Config,
    forvo::{Forvo, HttpForvoClient},
    media::LocalMediaStore,
    storage::Database,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "forvo-relay starting");

    // Load configuration
    let config = Config::load()?;

    // Initialize cache database
    let db = Database::open(&config.storage.data_dir)?;
    info!(
        records = db.count()?,
        "Cache opened at: {}", config.storage.data_dir
    );

    // Initialize media directory
    let media = Arc::new(LocalMediaStore::new(&config.storage.media_dir)?);
    info!("Serving audio from: {}", config.storage.media_dir);

    // One resolver for the whole process
    let client = Arc::new(HttpForvoClient::new(&config.forvo)?);
    let resolver = Arc::new(Forvo::new(
        config.forvo.audio_host.clone(),
        config.server.public_url.clone(),
        client,
        db.clone(),
        media.clone(),
    ));

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        media,
        resolver,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    info!(
        public_url = %config.server.public_url,
        "Listening on: {}", config.server.bind_address
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
