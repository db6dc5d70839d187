//! Fraud Detection Form - Main Entry Point
//!
//! Loads the classification model once, then serves the transaction form
//! until the process is stopped.

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use fraud_detection_form::{
    config::AppConfig,
    logging,
    metrics::{AnalysisMetrics, MetricsReporter},
    models::loader::CachedModel,
    web::{configure, AppState},
    FeatureExtractor,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.logging)?;

    info!("Starting Fraud Detection Form");
    info!(
        model = %config.model.path,
        schema = ?config.model.schema_path,
        features = FeatureExtractor::new().feature_count(),
        "Configuration loaded successfully"
    );

    let metrics = Arc::new(AnalysisMetrics::new());
    let model = Arc::new(CachedModel::from_config(&config.model));

    // The page needs the model status on first render; resolve it now
    if model.is_available() {
        info!(model = %model.resource(), "Inference enabled");
    } else {
        warn!(
            model = %model.resource(),
            "Serving form with inference disabled"
        );
    }

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        actix_web::rt::spawn(reporter.start());
    }

    let state = web::Data::new(AppState::new(model, metrics.clone()));
    let bind_address = (config.server.host.clone(), config.server.port);

    info!(
        host = %config.server.host,
        port = config.server.port,
        workers = config.server.workers,
        "Starting HTTP server"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(TracingLogger::default())
            .configure(configure)
    })
    .workers(config.server.workers)
    .bind(bind_address)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server terminated with an error")?;

    info!("Server shutting down...");
    metrics.print_summary();

    Ok(())
}
