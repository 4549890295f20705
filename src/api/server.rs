use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{
    services::{
        clear_downloads, delete_download, download_status, health, list_downloads,
        quality_presets, serve_download, submit_download, video_info,
    },
    state::AppState,
};
use crate::config::Config;
use crate::observability::Metrics;
use crate::queue::{JobBroker, JobQueue};
use crate::status::StatusStore;
use crate::tools::{Ffmpeg, YtDlp};
use crate::worker::{self, WorkerContext, sweeper};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/download", post(submit_download))
        .route("/api/download-status/{id}", get(download_status))
        .route("/api/downloads", get(list_downloads))
        .route("/api/downloads/clear", post(clear_downloads))
        .route("/api/downloads/{name}", delete(delete_download))
        .route("/api/quality-presets", get(quality_presets))
        .route("/api/video-info", post(video_info))
        .route("/download/{name}", get(serve_download))
        .route("/health", get(health))
        .with_state(state)
        // Automatically decompress gzip request bodies
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Open the stores, start the worker and sweeper, and serve until a shutdown
/// signal arrives
pub async fn run(config: Config) -> Result<(), AnyError> {
    let server = &config.server;
    tokio::fs::create_dir_all(&server.download_dir)
        .await
        .map_err(|e| format!("Failed to create {}: {e}", server.download_dir.display()))?;

    info!(path = %server.queue_path().display(), "Opening job queue");
    let queue = Arc::new(RwLock::new(
        JobQueue::open(server.queue_path()).map_err(|e| format!("Failed to open queue: {e}"))?,
    ));

    info!(path = %server.status_dir().display(), "Opening status store");
    let status = Arc::new(
        StatusStore::open(server.status_dir())
            .map_err(|e| format!("Failed to open status store: {e}"))?,
    );

    let (broker, worker_rx) = JobBroker::new(queue.clone());
    let broker = Arc::new(broker);
    let fetcher = Arc::new(YtDlp::from_config(&config.tools));
    let metrics = Arc::new(Metrics::new());

    let ctx = WorkerContext {
        broker: broker.clone(),
        status: status.clone(),
        fetcher: fetcher.clone(),
        transcoder: Arc::new(Ffmpeg::from_config(&config.tools)),
        metrics: metrics.clone(),
        download_dir: server.download_dir.clone(),
    };

    broker.recover().await?;
    let worker_handle = worker::spawn(ctx, worker_rx);
    let sweeper_handle = sweeper::spawn(
        status.clone(),
        config.retention.status_ttl(),
        config.retention.sweep_interval(),
    );

    let address = server.bind_addr;
    let state = AppState::new(config.clone(), broker, status, fetcher, metrics);
    let app = build_router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "mediabox listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Unfinished jobs stay in the queue and are recovered on the next start
    worker_handle.abort();
    sweeper_handle.abort();
    if let Err(e) = queue.read().await.flush() {
        warn!(error = %e, "Failed to flush job queue");
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
