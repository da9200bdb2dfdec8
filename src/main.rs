use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use watchpost::analyzer::{Analyzer, SimulatedAnalyzer};
use watchpost::api::{create_app, ApiState};
use watchpost::config::{load_config, WatchpostConfig};
use watchpost::generator::IncidentGenerator;
use watchpost::hub::BroadcastHub;
use watchpost::store::{seed_demo_data, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watchpost=info".into()),
        )
        .init();

    info!("Watchpost starting...");

    let mut config = match std::env::var("WATCHPOST_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading configuration");
            load_config(&path)?
        }
        Err(_) => WatchpostConfig::default(),
    };
    config.apply_env();

    let store = Arc::new(SqliteStore::new(&config.database.path)?);
    info!(path = %config.database.path, "Database ready");

    if config.seed.enabled {
        seed_demo_data(&store, &mut rand::thread_rng()).context("Failed to seed demo data")?;
    }

    let hub = Arc::new(BroadcastHub::new());
    let analyzer: Arc<dyn Analyzer> = Arc::new(SimulatedAnalyzer::new(&config.analyzer));
    let shutdown = CancellationToken::new();

    let generator_handle = if config.generator.enabled {
        let generator = IncidentGenerator::new(
            config.generator.clone(),
            Arc::clone(&analyzer),
            store.clone(),
            Arc::clone(&hub),
        )
        .context("Invalid generator configuration")?
        .with_analyzer_timeout(Duration::from_millis(config.analyzer.timeout_ms));

        Some(generator.spawn(shutdown.clone()))
    } else {
        info!("Incident generator disabled");
        None
    };

    let state = Arc::new(ApiState {
        store,
        hub,
        analyzer,
    });
    let app = create_app(state, &config.server.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "HTTP server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "Failed to listen for ctrl_c signal");
                    }
                    info!("Shutdown signal received");
                }
                _ = server_shutdown.cancelled() => {}
            }
        })
        .await
        .context("HTTP server error")?;

    shutdown.cancel();
    if let Some(handle) = generator_handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "Incident generator task ended abnormally");
        }
    }

    info!("Watchpost stopped");
    Ok(())
}
