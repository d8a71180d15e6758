//! Runs the tracking engine against a browser host on stdin/stdout.
//!
//! Stdout carries the bridge protocol, so everything human-readable goes
//! through `tracing` to stderr while watching.

use crate::db::{domains::Domains, DomainStore};
use crate::libs::activity::SignalSource;
use crate::libs::bridge::Bridge;
use crate::libs::clock::SystemClock;
use crate::libs::config::Config;
use crate::libs::engine::Engine;
use crate::libs::messages::Message;
use crate::libs::session::SessionManager;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::time::timeout;

/// How long queued outbound messages may take to drain after the engine stops.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn cmd() -> Result<()> {
    let config = Config::read()?;
    let store: Arc<dyn DomainStore> = Arc::new(Domains::new()?);

    let (bridge, outbound) = Bridge::new();
    let signals = SignalSource::new(bridge.clone(), bridge.clone(), config.timing.probe_deadline());
    let manager = SessionManager::new(store, bridge.clone(), config.settings, &config.timing);
    let (engine, handle) = Engine::new(manager, signals, Arc::new(SystemClock), config.timing);

    let engine_task = tokio::spawn(engine.run());
    let writer_task = tokio::spawn(Bridge::run_writer(outbound, tokio::io::stdout()));
    let reader_task = tokio::spawn(Arc::clone(&bridge).run_reader(BufReader::new(tokio::io::stdin()), handle.clone()));
    let reader_abort = reader_task.abort_handle();

    tokio::select! {
        result = reader_task => match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("{}", Message::EngineError(e.to_string())),
            Err(e) => tracing::error!("{}", Message::EngineTaskPanicked(e.to_string())),
        },
        _ = shutdown_signal() => {}
    }

    if let Err(e) = handle.shutdown().await {
        tracing::debug!("{}", e);
    }
    match engine_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!("{}", Message::EngineError(e.to_string())),
        Err(e) => tracing::error!("{}", Message::EngineTaskPanicked(e.to_string())),
    }

    // The writer stops once the last bridge reference is gone.
    reader_abort.abort();
    drop(bridge);
    match timeout(WRITER_DRAIN_TIMEOUT, writer_task).await {
        Ok(Ok(Err(e))) => tracing::warn!("{}", Message::BridgeWriteFailed(e.to_string())),
        Ok(Err(e)) => tracing::error!("{}", Message::EngineTaskPanicked(e.to_string())),
        _ => {}
    }

    Ok(())
}

/// Resolves when the process is asked to terminate.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(_) => {
            tracing::error!("{}", Message::FailedToCreateSigtermHandler);
            return std::future::pending().await;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(stream) => stream,
        Err(_) => {
            tracing::error!("{}", Message::FailedToCreateSigintHandler);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("{}", Message::WatcherReceivedSigterm),
        _ = sigint.recv() => tracing::info!("{}", Message::WatcherReceivedSigint),
    }
}

#[cfg(windows)]
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("{}", Message::WatcherReceivedCtrlC),
        Err(e) => {
            tracing::error!("{}", Message::WatcherCtrlCListenFailed(e.to_string()));
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(any(unix, windows)))]
async fn shutdown_signal() {
    tracing::warn!("{}", Message::WatcherSignalHandlingNotSupported);
    std::future::pending::<()>().await;
}
