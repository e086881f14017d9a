// sketo entry point: opens the embedded store, reloads the document
// counters, then runs the API listener, the metrics listener and the
// value-log compactor until SIGINT/SIGTERM.
use std::time::Duration;

use anyhow::Context;
use sketo::app::{AppState, build_router};
use sketo::config::Config;
use sketo::repo::Repository;
use sketo::{counters, observability};
use sketo_store::Store;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let metrics_handle = observability::init_observability();

    let config = Config::from_env_or_yaml().context("load configuration")?;
    let store = Store::open(&config.storage_dir)
        .with_context(|| format!("open store at {}", config.storage_dir.display()))?;
    let repo = Repository::new(store.clone());
    counters::reload(&repo).context("reload counters")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    tokio::spawn(run_compactor(store));
    tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
        wait_for_shutdown(shutdown_rx.clone()),
    ));

    let app = build_router(AppState { repo });
    let addr = config.bind_addr;
    tracing::info!(%addr, "api listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .await?;

    tracing::info!("exiting");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

// SIGINT/SIGTERM begin graceful shutdown; SIGHUP is logged and ignored.
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt()).expect("install SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let mut hangup = signal(SignalKind::hangup()).expect("install SIGHUP handler");
    loop {
        tokio::select! {
            _ = interrupt.recv() => {
                tracing::info!("received SIGINT, shutting down");
                break;
            }
            _ = terminate.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break;
            }
            _ = hangup.recv() => {
                tracing::info!("received SIGHUP; nothing to reload");
            }
        }
    }
}

// Value-log garbage collection on a fixed timer, looping while the store
// reports reclaimed work, for the lifetime of the process.
async fn run_compactor(store: Store) {
    let mut ticker = tokio::time::interval(Duration::from_secs(5 * 60));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let store = store.clone();
        let outcome =
            tokio::task::spawn_blocking(move || -> sketo_store::Result<()> {
                while store.compact()? {}
                Ok(())
            })
            .await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(error = %err, "value log compaction failed"),
            Err(err) => tracing::error!(error = %err, "compaction task failed"),
        }
    }
}
