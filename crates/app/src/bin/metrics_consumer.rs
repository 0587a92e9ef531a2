//! Metrics consumer binary.
//!
//! Drains the metrics topic into the log sink until SIGINT/SIGTERM, then
//! commits the stored offsets and exits.

use std::sync::Arc;

use anyhow::Result;
use app_config::AppConfig;
use kafka_consumer::{LogHandler, MetricsConsumer};
use tokio::signal;
use tokio::sync::Notify;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = AppConfig::load()?;
    info!("starting metrics consumer");

    let consumer = MetricsConsumer::new(
        &cfg.kafka_brokers,
        &cfg.kafka_topic,
        &cfg.kafka_consumer_group,
        LogHandler,
    )?;

    let shutdown = Arc::new(Notify::new());
    let notifier = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        notifier.notify_one();
    });

    consumer.run(shutdown).await?;
    info!("metrics consumer shut down gracefully");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
