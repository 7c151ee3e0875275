//! Serve command - auto-indexer plus HTTP server in one process.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::autoindex::Orchestrator;
use crate::cli::ServeArgs;
use crate::config::Settings;
use crate::fingerprint::DirHasher;
use crate::indexer::ManifestEngine;
use crate::server::{self, AppState};

/// Run the serve command until SIGINT or SIGTERM.
pub async fn run(args: ServeArgs, mut settings: Settings) -> anyhow::Result<()> {
    args.apply(&mut settings);
    run_server(settings, shutdown_signal()).await
}

/// Start both tasks and stop them when `shutdown` resolves.
///
/// Auto-index initialization must succeed before the listener is bound: a
/// corrupt state file or an unwatchable project path returns an error and
/// nothing is served.
pub async fn run_server<F>(settings: Settings, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send,
{
    crate::log_event!("serve", "data dir", "{}", settings.data_dir.display());

    let mut orchestrator = Orchestrator::new(
        settings.autoindex_path(),
        Arc::new(DirHasher::new()),
        Arc::new(ManifestEngine::new(settings.index_dir())),
        settings.watch.clone(),
    );
    let adapter = orchestrator
        .initialize()
        .await
        .context("auto-index startup failed")?;

    let state = Arc::new(AppState::from_settings(&settings)?);
    let listener = TcpListener::bind(&settings.http.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.http.bind))?;

    let cancel = CancellationToken::new();
    let autoindex = tokio::spawn(orchestrator.run(adapter, cancel.clone()));
    let http = tokio::spawn(server::serve(listener, state, cancel.clone()));

    shutdown.await;
    crate::log_event!("serve", "shutting down");
    cancel.cancel();

    let grace = Duration::from_secs(settings.watch.shutdown_grace_secs);
    match tokio::time::timeout(grace, async { tokio::join!(autoindex, http) }).await {
        Ok((autoindex, http)) => {
            autoindex?.context("auto-index shutdown failed")?;
            http??;
        }
        Err(_) => {
            tracing::warn!("[serve] tasks still running after {grace:?}, exiting anyway");
        }
    }

    crate::log_event!("serve", "stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[serve] failed to listen for ctrl+c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("[serve] failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    crate::log_event!("serve", "signal received");
}
