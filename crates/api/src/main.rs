//! Process entry point: HTTP ingress plus the saga stage workers.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use metrics_exporter_prometheus::PrometheusHandle;
use queue::InMemoryQueue;
use saga::SagaRuntime;
use store::{InMemoryRecordStore, PostgresRecordStore, RecordStore};
use tokio::signal;
use tokio::sync::watch;
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

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Runs the stage workers and the HTTP server until a shutdown signal, then
/// lets in-flight batches finish.
async fn run<S>(config: Config, store: S, metrics_handle: PrometheusHandle)
where
    S: RecordStore + Clone + 'static,
{
    let queue = InMemoryQueue::new(config.queue_config());

    let runtime = SagaRuntime::new(store.clone(), queue.clone(), config.runtime_options());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = runtime.spawn(shutdown_rx);

    let state = Arc::new(api::AppState::new(store, queue, config.page_limit));
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("stopping saga workers");
    let _ = shutdown_tx.send(true);
    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "stage worker failed");
        }
    }

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the record store and serve
    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresRecordStore::connect(&url)
                .await
                .expect("failed to connect to database");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL record store");
            run(config, store, metrics_handle).await;
        }
        None => {
            tracing::info!("using in-memory record store");
            run(config, InMemoryRecordStore::new(), metrics_handle).await;
        }
    }
}
