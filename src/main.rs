use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod pool;
mod tts;

use api::routes::{create_router, AppState};
use config::{CliArgs, ServerConfig};
use pool::ElasticPool;
use tts::{PiperFactory, TtsService, Voice};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let config = ServerConfig::try_from(CliArgs::parse())?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    tracing::info!("TTS Pool Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Voices directory: {}", config.voices_dir.display());
    tracing::debug!("Configuration: {:#?}", config);

    let voice = Voice::load(&config.voices_dir, &config.voice)?;
    let model = voice.info();
    tracing::info!(
        "Serving voice {} ({}, {} Hz, {} speakers)",
        model.id,
        model.language,
        model.sample_rate,
        model.speakers.len().max(1)
    );

    let pool = ElasticPool::new(
        PiperFactory::new(voice, config.intra_threads),
        config.pool.clone(),
    )?;
    if let Err(e) = pool.warm_up(config.pool.initial_size).await {
        tracing::error!(
            "{}; requests get 503 until a pipeline can be built on demand",
            e
        );
    }

    let state = Arc::new(AppState {
        tts: TtsService::new(pool, model),
    });
    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!("Starting server on http://{}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.tts.shutdown();
    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, draining requests...");
}
