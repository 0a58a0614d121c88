use std::net::SocketAddr;

use vocab_review_backend::config::Config;
use vocab_review_backend::logging::{init_tracing, LogSettings};
use vocab_review_backend::state::AppState;
use vocab_review_backend::workers::WorkerManager;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&LogSettings::from_env(&config.log_level));
    config.report_rejected();

    if let Err(err) = tokio::fs::create_dir_all(&config.data_dir).await {
        tracing::error!(path = %config.data_dir.display(), error = %err, "failed to create data directory");
    }

    let state = AppState::new(config.clone());
    let sessions = state.sessions();

    let worker_manager = if config.session_cleanup_enabled {
        match WorkerManager::new(state.sessions()).await {
            Ok(manager) => {
                if let Err(e) = manager
                    .start(&config.session_cleanup_schedule, config.session_idle_ttl)
                    .await
                {
                    tracing::error!(error = %e, "failed to start workers");
                }
                Some(manager)
            }
            Err(e) => {
                tracing::warn!(error = %e, "worker manager not initialized");
                None
            }
        }
    } else {
        tracing::info!("ENABLE_SESSION_CLEANUP is off, idle sessions are kept until logout");
        None
    };

    let app = vocab_review_backend::build_router(state);

    let addr = config.bind_addr();
    tracing::info!(%addr, data_dir = %config.data_dir.display(), "vocab-review-backend listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener failed");

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("HTTP server stopped, initiating graceful shutdown sequence");

    if let Some(ref manager) = worker_manager {
        manager.stop().await;
    }

    sessions.persist_all().await;
    tracing::info!(sessions = sessions.len(), "Graceful shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
