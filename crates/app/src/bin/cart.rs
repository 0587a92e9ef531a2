//! Cart service binary.
//!
//! Wires the cart gateway over the Postgres repository, the HTTP stock
//! client, and the Kafka event sink, then serves until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::Result;
use app_config::AppConfig;
use kafka_producer::{EventProducer, KafkaEventSink, DEFAULT_PARTITION};
use repository::PgCartRepository;
use server::CartServer;
use service::CartService;
use stock_client::HttpStockClient;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = AppConfig::load()?;
    info!("starting cart service");

    let pool = db::init_db_pool(&cfg).await?;
    let repo = PgCartRepository::new(pool);
    let stock = HttpStockClient::new(cfg.client_url.clone());

    let producer = Arc::new(EventProducer::new(
        &cfg.kafka_brokers,
        cfg.kafka_topic.clone(),
        DEFAULT_PARTITION,
    )?);
    let events = Arc::new(KafkaEventSink::new(producer));

    let usecase = Arc::new(CartService::new(repo, stock, events));

    CartServer::new(cfg.gateway_addr(), usecase, cfg.prometheus)
        .start()
        .await
}
