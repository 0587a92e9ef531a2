//! Metrics consumer: drains metric records from Kafka and hands each one
//! to a record handler.
//!
//! Offsets are stored only after a record was handled and committed on
//! shutdown; auto-commit is disabled. Read errors are logged and the loop
//! keeps going until the shutdown signal fires.

use std::sync::Arc;

use anyhow::Result;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::types::RDKafkaErrorCode;
use tokio_stream::StreamExt;
use tracing::{error, info};

/// Per-record callback invoked for every polled message.
pub trait RecordHandler: Send + Sync {
    fn handle(&self, payload: &[u8], partition: i32, offset: i64);
}

/// Production handler: appends each record to the log sink.
pub struct LogHandler;

impl RecordHandler for LogHandler {
    fn handle(&self, payload: &[u8], partition: i32, offset: i64) {
        info!(
            partition,
            offset,
            message = %String::from_utf8_lossy(payload),
            "metric record"
        );
    }
}

/// Single-topic, single-group consumer loop.
pub struct MetricsConsumer<H> {
    consumer: StreamConsumer,
    handler: H,
}

impl<H: RecordHandler> MetricsConsumer<H> {
    /// Create a consumer for the specified brokers/topic/group.
    ///
    /// Auto-commit and auto-offset-store are disabled: an offset is stored
    /// only after its record was handled, and stored offsets are committed
    /// when the loop stops.
    pub fn new(
        brokers: &[String],
        topic: &str,
        group_id: &str,
        handler: H,
    ) -> Result<Self, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("group.id", group_id)
            .set("session.timeout.ms", "7000")
            .set("enable.partition.eof", "false")
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;

        consumer.subscribe(&[topic])?;
        Ok(Self { consumer, handler })
    }

    /// Runs the poll loop until `shutdown` fires, then commits the stored
    /// offsets and returns.
    pub async fn run(&self, shutdown: Arc<tokio::sync::Notify>) -> Result<()> {
        let mut stream = self.consumer.stream();

        loop {
            tokio::select! {
                maybe_msg = stream.next() => {
                    match maybe_msg {
                        Some(Ok(msg)) => self.handle_message(&msg),
                        Some(Err(e)) => {
                            error!("Kafka read failed: {e}");
                        }
                        None => break,
                    }
                }
                _ = shutdown.notified() => {
                    info!("Metrics consumer received shutdown signal.");
                    break;
                }
            }
        }

        self.stop()
    }

    fn handle_message(&self, msg: &BorrowedMessage<'_>) {
        let payload = msg.payload().unwrap_or_default();
        self.handler.handle(payload, msg.partition(), msg.offset());

        if let Err(e) = self.consumer.store_offset_from_message(msg) {
            error!("Kafka offset store failed: {e}");
        }
    }

    /// Commit the stored offsets before closing. Nothing stored yet is not
    /// an error.
    fn stop(&self) -> Result<()> {
        match self.consumer.commit_consumer_state(CommitMode::Sync) {
            Ok(())
            | Err(KafkaError::ConsumerCommit(RDKafkaErrorCode::NoOffset)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LogHandler, RecordHandler};

    #[test]
    fn log_handler_accepts_arbitrary_bytes() {
        LogHandler.handle(br#"{"type":"stock_changed"}"#, 0, 42);
        LogHandler.handle(&[0xff, 0xfe], 1, 0);
    }
}
