//! Kitchen display server entry point.

use api::config::Config;
use order_store::{InMemoryOrderStore, SnapshotWriter, StoreSnapshot};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Builds the order store, restoring the last snapshot when one exists.
async fn load_store(config: &Config) -> InMemoryOrderStore {
    let Some(path) = &config.snapshot_path else {
        tracing::warn!("KDS_SNAPSHOT_PATH not set, orders will not survive a restart");
        return InMemoryOrderStore::new();
    };

    match StoreSnapshot::load(path)
        .await
        .expect("failed to read order snapshot")
    {
        Some(snapshot) => {
            tracing::info!(
                path = %path.display(),
                orders = snapshot.orders.len(),
                taken_at = %snapshot.taken_at,
                "restored order snapshot"
            );
            InMemoryOrderStore::from_snapshot(snapshot)
        }
        None => {
            tracing::info!(path = %path.display(), "no snapshot found, starting empty");
            InMemoryOrderStore::new()
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Restore orders and build application state
    let store = load_store(&config).await;
    let (state, dispatcher) = api::create_default_state(store.clone(), &config);
    let dispatcher_handle = dispatcher.spawn();

    // 4. Persist snapshots in the background
    let snapshots = config
        .snapshot_path
        .as_ref()
        .map(|path| SnapshotWriter::new(store.clone(), path));
    let snapshot_task = snapshots
        .as_ref()
        .map(|writer| writer.spawn_periodic(config.snapshot_interval));

    // 5. Build the application
    let app = api::create_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting kitchen display server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Final snapshot
    if let Some(task) = snapshot_task {
        task.abort();
    }
    if let Some(writer) = &snapshots {
        match writer.flush().await {
            Ok(written) => tracing::info!(written, "final snapshot flushed"),
            Err(e) => tracing::error!(error = %e, "failed to write final snapshot"),
        }
    }
    dispatcher_handle.abort();

    tracing::info!("server shut down gracefully");
}
