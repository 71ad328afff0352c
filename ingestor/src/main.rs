use anyhow::Context;
use axum::{routing::get, Router};
use ccsds_ingestor::config::Config;
use ccsds_ingestor::db::{self, PgSink};
use ccsds_ingestor::listener::Listener;
use ccsds_ingestor::metrics;
use ccsds_ingestor::sink::MemorySink;
use ccsds_ingestor::writer::run_writer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    info!("Starting CCSDS telemetry ingestor");
    info!("UDP listener: {}", config.udp_addr);
    info!("HTTP server: {}", config.http_addr);
    info!("Database: {}", config.database_display());

    metrics::init_metrics().context("failed to register metrics")?;

    // Create bounded channel between the socket and the sink
    info!("Channel capacity: {}", config.channel_capacity);
    let (tx, rx) = mpsc::channel(config.channel_capacity);

    let writer_handle = match &config.database_url {
        Some(url) => {
            let pool = db::make_pool(url, config.db_max_connections)
                .await
                .context("failed to connect to database")?;
            tokio::spawn(run_writer(rx, Arc::new(PgSink::new(pool)), config.max_in_flight))
        }
        None => {
            warn!("DATABASE_URL not set, telemetry is kept in memory only");
            tokio::spawn(run_writer(rx, Arc::new(MemorySink::new()), config.max_in_flight))
        }
    };

    let listener = Listener::bind(&config.udp_addr, tx)
        .await
        .with_context(|| format!("failed to bind UDP socket on {}", config.udp_addr))?;
    let mut listener_handle = tokio::spawn(listener.run(shutdown_signal()));

    // Metrics endpoint
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(|| async { "ok" }));

    let http_listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", config.http_addr))?;

    info!("HTTP server listening on {}", config.http_addr);

    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        result = &mut listener_handle => match result {
            Ok(Ok(())) => info!("Listener finished"),
            Ok(Err(e)) => error!("Listener failed: {}", e),
            Err(e) => error!("Listener task terminated: {}", e),
        },
        _ = &mut server_handle => {
            error!("HTTP server terminated");
            listener_handle.abort();
        }
    }

    // The listener has dropped its sender; let queued records drain
    if let Err(e) = writer_handle.await {
        error!("Writer task terminated: {}", e);
    }
    server_handle.abort();

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
