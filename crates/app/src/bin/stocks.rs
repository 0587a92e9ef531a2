//! Stocks service binary.
//!
//! Wires the stocks gateway over the Postgres repository and the Kafka
//! event sink, then serves until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::Result;
use app_config::AppConfig;
use kafka_producer::{EventProducer, KafkaEventSink, DEFAULT_PARTITION};
use repository::PgStockRepository;
use server::StockServer;
use service::StockService;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = AppConfig::load()?;
    info!("starting stocks service");

    let pool = db::init_db_pool(&cfg).await?;
    let repo = PgStockRepository::new(pool);

    let producer = Arc::new(EventProducer::new(
        &cfg.kafka_brokers,
        cfg.kafka_topic.clone(),
        DEFAULT_PARTITION,
    )?);
    let events = Arc::new(KafkaEventSink::new(producer));

    let usecase = Arc::new(StockService::new(repo, events));

    StockServer::new(cfg.gateway_addr(), usecase, cfg.prometheus)
        .start()
        .await
}
