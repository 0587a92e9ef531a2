//! Database initialization and migration logic shared by the cart and
//! stocks services.
//!
//! Provides `init_db_pool` for creating a connection pool and
//! auto-applying SQL migrations from the configured migrations directory.

use anyhow::{Context, Result};
use app_config::AppConfig;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio::fs;
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::info;

/// Initializes the database connection pool and runs migrations.
///
/// # Arguments
/// * `cfg` - The loaded application configuration.
///
/// # Returns
/// * `Pool` - A pool of PostgreSQL connections, ready for async use.
///
/// # Errors
/// Returns an error if the pool cannot be created, the database stays
/// unreachable past the retry budget, or migrations fail.
pub async fn init_db_pool(cfg: &AppConfig) -> Result<Pool> {
    let pg_config: PgConfig = cfg
        .db_dsn()
        .parse()
        .context("Failed to parse Postgres DSN")?;

    let mgr = Manager::from_config(
        pg_config,
        NoTls,
        ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        },
    );
    let pool = Pool::builder(mgr)
        .max_size(16)
        .runtime(Runtime::Tokio1)
        .build()
        .context("Failed to create database pool")?;

    // Try to get a connection with retries; the database container may
    // still be coming up.
    let max_retries = 5;
    let mut retry_count = 0;
    let mut last_error = None;

    while retry_count < max_retries {
        match pool.get().await {
            Ok(client) => {
                info!(retries = retry_count, "connected to database");

                let migrations_dir = cfg.migration_source_url.as_str();
                if fs::metadata(migrations_dir).await.is_ok() {
                    run_migrations(&client, migrations_dir).await?;
                } else {
                    info!(dir = migrations_dir, "migrations directory not found, skipping");
                }
                return Ok(pool);
            }
            Err(e) => {
                retry_count += 1;
                last_error = Some(e);
                info!(
                    "failed to connect to database (attempt {}/{}), retrying in 1 second",
                    retry_count, max_retries
                );
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }

    Err(anyhow::anyhow!(
        "failed to get DB connection after {} retries: {:?}",
        max_retries,
        last_error
    ))
}

/// Applies all SQL migrations from the given directory, in filename order.
///
/// # Arguments
/// * `client` - An active Postgres client.
/// * `migrations_dir` - Path to the folder containing .sql migration files.
///
/// # Errors
/// Returns an error if migration files cannot be read or applied.
pub async fn run_migrations(client: &Client, migrations_dir: &str) -> Result<()> {
    let mut entries = fs::read_dir(migrations_dir)
        .await
        .context("Failed to read migrations directory")?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "sql") {
            paths.push(path);
        }
    }
    // read_dir order is platform-dependent; the files are numbered.
    paths.sort();

    for path in paths {
        let file_name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        info!(migration = %file_name, "applying migration");
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read migration file {file_name}"))?;

        client
            .batch_execute(&content)
            .await
            .with_context(|| format!("Failed to execute migration {file_name}"))?;
    }
    Ok(())
}
