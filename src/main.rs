//! Client Cache - demo driver
//!
//! Runs a storage over the memory adapter with a background sweep task and
//! logs modification events until interrupted.

use std::sync::Arc;

use anyhow::Context;
use serde_json::json;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use client_cache::collaborators::{BroadcastEmitter, Collaborators};
use client_cache::{spawn_sweep_task, MemoryAdapter, StorageConfig, StorageService};

/// Main entry point for the demo driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the storage service over a memory adapter
/// 4. Start the background sweep task
/// 5. Run a short session and report what the adapter holds
/// 6. Wait for SIGINT/SIGTERM and shut down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "client_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting client cache demo");

    let config = StorageConfig::from_env();
    info!(
        "Configuration loaded: name={}, max_size={}b, expiration={}s, auto_refresh_interval={}s",
        config.name, config.max_size, config.expiration, config.auto_refresh_interval
    );

    let emitter = BroadcastEmitter::default();
    let mut events = emitter.subscribe();
    let collaborators = Collaborators::default().with_events(Arc::new(emitter));

    let adapter = MemoryAdapter::new(&config.adapter_config());
    let backend = adapter.clone();
    let service = StorageService::new(config, move |_| Arc::new(backend), collaborators)
        .context("failed to create storage service")?;
    info!(
        "Storage '{}' initialized on the {} adapter",
        service.name(),
        service.adapter_name()
    );

    let sweep_handle = spawn_sweep_task(service.clone(), service.auto_refresh_interval());

    let listener = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!("Event {} from storage '{}'", event.event, event.name);
        }
    });

    service
        .set_all(vec![
            ("greeting".to_string(), json!("hello")),
            ("visits".to_string(), json!(1)),
        ])
        .await
        .context("demo write failed")?;
    let stored = service.get_all(None, false).await.context("demo read failed")?;
    info!("Stored entries: {}", serde_json::to_string(&stored)?);

    service.remove("visits", false).await.context("demo remove failed")?;
    let stats = adapter.stats();
    info!(
        "Size after session: {:.3}KB of {:.0}KB, hit rate: {:.2}, adapter stats: {}",
        service.size().await?,
        service.max_size(),
        stats.hit_rate(),
        serde_json::to_string(&stats)?
    );

    shutdown_signal().await;

    sweep_handle.abort();
    listener.abort();
    warn!("Sweep task aborted");
    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
