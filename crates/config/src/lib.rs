use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// `AppConfig` holds all configuration parameters shared by the cart,
/// stocks, and metrics-consumer deployables.
///
/// Values come from environment variables (optionally via a `.env` file);
/// every field has a default suited to local development. Each deployable
/// reads the same surface and ignores the parts it does not use.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    // --- Database settings ---
    /// Database hostname or service name (e.g. "postgres" in Docker Compose).
    pub db_host: String,
    /// Database port (default: 5432).
    pub db_port: u16,
    /// Database user.
    pub db_user: String,
    /// Database password.
    pub db_password: String,
    /// Database name.
    pub db_name: String,
    /// TLS mode for the Postgres connection ("disable" locally).
    pub db_sslmode: String,
    /// Directory of SQL migration files applied at startup.
    pub migration_source_url: String,

    // --- Cross-service RPC ---
    /// Cart's pointer to the Stock service item lookup.
    pub client_url: String,

    // --- Kafka settings ---
    /// List of Kafka brokers (comma-separated in env, parsed to Vec<String>).
    pub kafka_brokers: Vec<String>,
    /// Topic carrying metric records.
    pub kafka_topic: String,
    /// Consumer group of the metrics consumer.
    pub kafka_consumer_group: String,

    // --- Listeners ---
    /// Host the RPC listener binds to.
    pub grpc_host: String,
    /// Port of the RPC listener.
    pub grpc_port: u16,
    /// Network the RPC listener uses ("tcp").
    pub grpc_network: String,
    /// Host the HTTP gateway binds to.
    pub gateway_server_host: String,
    /// Port of the HTTP gateway.
    pub gateway_server_port: u16,

    // --- Observability ---
    /// Trace collector endpoint.
    pub jaeger_endpoint: String,
    /// Expose the prometheus `/metrics` route on the gateway.
    pub prometheus: bool,

    // --- Shutdown timeout ---
    /// Graceful shutdown timeout (human-friendly format, e.g. "5s", "1m").
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub shutdown_timeout: Duration,
}

/// Custom deserializer for graceful shutdown timeout.
/// Accepts human-readable formats like "5s", "1m", etc.
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let val = String::deserialize(deserializer)?;
    humantime::parse_duration(&val)
        .map_err(|e| D::Error::custom(format!("Invalid duration '{val}': {e}")))
}

impl AppConfig {
    /// Loads configuration from environment variables (and optionally from
    /// a `.env` file). Fields not set via env fall back to the defaults.
    ///
    /// # Errors
    /// Returns an error if environment variables are invalid or cannot be
    /// deserialized into the expected types.
    pub fn load() -> Result<Self> {
        // Load from .env file (for Docker environment)
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            // Database
            .set_default("db_host", "localhost")?
            .set_default("db_port", 5432)?
            .set_default("db_user", "postgres")?
            .set_default("db_password", "postgres")?
            .set_default("db_name", "marketplace")?
            .set_default("db_sslmode", "disable")?
            .set_default("migration_source_url", "./migrations")?
            // Cross-service RPC
            .set_default("client_url", "http://localhost:8082/stocks/item/get")?
            // Kafka
            .set_default("kafka_brokers", vec!["localhost:9092"])?
            .set_default("kafka_topic", "metrics")?
            .set_default("kafka_consumer_group", "metrics_group")?
            // Listeners
            .set_default("grpc_host", "0.0.0.0")?
            .set_default("grpc_port", 50051)?
            .set_default("grpc_network", "tcp")?
            .set_default("gateway_server_host", "0.0.0.0")?
            .set_default("gateway_server_port", 8080)?
            // Observability
            .set_default("jaeger_endpoint", "http://localhost:14268/api/traces")?
            .set_default("prometheus", true)?
            // Shutdown
            .set_default("shutdown_timeout", "5s")?
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("kafka_brokers"),
            )
            .build()?;

        settings
            .try_deserialize()
            .context("Failed to load configuration")
    }

    /// DSN for the Postgres connection, in key/value form.
    pub fn db_dsn(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={} sslmode={}",
            self.db_host, self.db_port, self.db_user, self.db_password, self.db_name, self.db_sslmode
        )
    }

    /// Bind address of the HTTP gateway.
    pub fn gateway_addr(&self) -> String {
        format!("{}:{}", self.gateway_server_host, self.gateway_server_port)
    }
}
