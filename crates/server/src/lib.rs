//! HTTP/JSON gateways for the cart and stocks services.
//!
//! Each service exposes its POST routes behind the shared response
//! envelope (`{"message": ...}` on success, `{"error": "..."}` on failure)
//! plus `/health` and, when enabled, prometheus metrics on `/metrics`.
//! Request routing is a pass-through: shape validation happens here, the
//! semantics live in the `service` crate.

mod cart;
mod metrics;
mod response;
mod stock;

pub use cart::CartServer;
pub use stock::StockServer;

use tokio::signal;
use tracing::info;

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
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

    info!("Shutdown signal received");
}
