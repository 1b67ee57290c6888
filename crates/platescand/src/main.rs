//! platescand: food photo analysis daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use platescan_api::ApiState;
use platescan_core::config::PlatescanConfig;
use platescan_core::{Catalog, Classifier};
use platescan_services::{run_sweeper, FoodAnalyzer, FoodLogStore, TaskEngine};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = PlatescanConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = PlatescanConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        PlatescanConfig::default()
    });
    tracing::info!(path = %PlatescanConfig::file_path().display(), "platescand starting");

    // Catalog is built once and shared read-only from here on.
    let catalog = Arc::new(Catalog::reference());
    tracing::info!(profiles = catalog.len(), "food catalog loaded");
    let classifier = Classifier::new(catalog);

    // Shared state
    let food_logs = FoodLogStore::new();
    let engine = TaskEngine::start(&config.engine);
    let analyzer = FoodAnalyzer::new(engine.clone(), classifier, Arc::new(food_logs.clone()));

    if config.engine.retention_secs > 0 {
        tokio::spawn(run_sweeper(
            engine.store().clone(),
            Duration::from_secs(config.engine.retention_secs),
            Duration::from_secs(config.engine.sweep_interval_secs.max(1)),
        ));
    } else {
        tracing::debug!("task retention disabled, finished tasks are kept");
    }

    let state = ApiState {
        analyzer,
        engine,
        food_logs,
        config: config.api.clone(),
    };

    platescan_api::serve(state, &config.api.bind_addr, config.api.port, shutdown_signal())
        .await
        .context("API server failed")?;

    tracing::info!("platescand stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
