//! Kafka producer for metric records.
//!
//! Publishing is best-effort from the mutator's standpoint: the database
//! write has already committed by the time an event is handed over, so a
//! lost event is accepted rather than rolled back. Failures are logged and
//! never reach the use-case path.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use model::event::MetricEvent;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use tracing::{debug, error};

/// Partition metric records are placed on. Configurable in principle,
/// fixed at startup.
pub const DEFAULT_PARTITION: i32 = 0;

/// Kafka publisher for metric records.
///
/// One send per call with a per-call delivery report; the topic and
/// partition are fixed at construction. Shared and thread-safe.
pub struct EventProducer {
    producer: FutureProducer,
    topic: String,
    partition: i32,
}

impl EventProducer {
    pub fn new(brokers: &[String], topic: impl Into<String>, partition: i32) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("message.timeout.ms", "5000")
            .create()
            .context("Failed to create Kafka producer")?;

        Ok(Self {
            producer,
            topic: topic.into(),
            partition,
        })
    }

    /// Serializes the record to JSON, hands it to the bus, and awaits the
    /// delivery report.
    pub async fn publish(&self, event: &MetricEvent) -> Result<()> {
        let data =
            serde_json::to_string(event).context("Failed to serialize metric event to JSON")?;

        let record = FutureRecord::<(), _>::to(&self.topic)
            .partition(self.partition)
            .payload(&data);

        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(kafka_err, _)| anyhow::anyhow!("Kafka delivery failed: {kafka_err}"))?;

        debug!(topic = %self.topic, partition = self.partition, "metric event published");
        Ok(())
    }
}

/// Use-case-facing seam for event emission.
///
/// Implementations report delivery problems by logging; a failed publish
/// never surfaces into the mutation path.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: MetricEvent);
}

/// Detached Kafka sink.
///
/// The send is spawned onto the runtime so that an event for a committed
/// mutation is not aborted when the request that triggered it is
/// cancelled; it runs to completion or is dropped only at process
/// shutdown.
pub struct KafkaEventSink {
    producer: Arc<EventProducer>,
}

impl KafkaEventSink {
    pub fn new(producer: Arc<EventProducer>) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl EventSink for KafkaEventSink {
    async fn publish(&self, event: MetricEvent) {
        let producer = Arc::clone(&self.producer);
        tokio::spawn(async move {
            if let Err(err) = producer.publish(&event).await {
                error!(error = %err, "metric event publish failed");
            }
        });
    }
}
