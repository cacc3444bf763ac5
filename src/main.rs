//! RouterView - Neighbor Watcher
//!
//! Headless entry point: listens for router discovery broadcasts and logs
//! every router that announces itself, alongside the routers already known
//! from the saved application state.

use anyhow::Context;
use crossbeam_channel::bounded;
use routerview_rs::{
    binding::{listener, DataBinding, Dispatcher},
    config::{AppConfig, AppState, LoggingConfig},
    neighbor::NeighborList,
};
use std::collections::HashSet;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "routerview.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default();
    let _log_guard = init_logging(&config.logging);

    tracing::info!("Starting RouterView neighbor watcher");

    let state = AppState::load_or_default();
    for router in &state.routers {
        tracing::info!(host = %router.host, ssl = router.ssl, user = %router.user, "Known router");
    }

    let neighbors = NeighborList::listen(&config.discovery, Dispatcher::from_mode(config.notify))
        .context("Failed to start neighbor discovery")?;

    let (changed_tx, changed_rx) = bounded::<()>(1);
    neighbors.add_listener(listener(move || {
        // A pending wakeup already covers this change
        let _ = changed_tx.try_send(());
    }));

    let mut reported = HashSet::new();
    while changed_rx.recv().is_ok() {
        for neighbor in neighbors.neighbors() {
            if reported.insert(neighbor.address().to_string()) {
                let known = state
                    .routers
                    .iter()
                    .any(|r| r.host == neighbor.ip());
                println!(
                    "{}{}",
                    neighbor.display(),
                    if known { " [known]" } else { "" }
                );
            }
        }
    }

    neighbors.close();
    Ok(())
}
