use travel_agency_backend::api::{self, AppState};
use travel_agency_backend::config::{Config, StoreBackend};
use travel_agency_backend::store::{DocumentStore, MemoryStore, PgDocumentStore};

use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env file if present
    let dotenv = dotenvy::dotenv();

    let config = Config::from_env()?;
    let _guard = init_logging(config.log_dir.as_deref());

    if let Err(e) = dotenv {
        debug!("No .env file loaded: {}", e);
    }

    let socket_addr = config.socket_addr()?;
    info!("Starting Travel Agency Backend on {}", socket_addr);
    for (kind, collection) in config.collections.iter() {
        debug!("Documents of kind {} stored in collection {}", kind, collection);
    }

    let store = build_store(&config).await?;

    let state = AppState::new(store, config.collections.clone()).with_database_settings(
        config.database_url.is_some(),
        config.database_name.is_some(),
    );
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on {}", socket_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Console logging, plus JSON logs with daily rotation when `log_dir` is set.
/// The returned guard flushes the file writer when dropped.
fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Warning: Could not create log directory {}: {}", dir.display(), e);
            }

            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "travel-agency-backend.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking);

            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,travel_agency_backend=debug")),
        )
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .init();

    if let Some(dir) = log_dir {
        debug!("Logging initialized - log directory: {}", dir.display());
    }

    guard
}

/// Build the single store client shared by every request.
///
/// A missing or unreachable database does not stop the server: document
/// endpoints report storage errors and `/test` describes the problem.
async fn build_store(config: &Config) -> anyhow::Result<Option<Arc<dyn DocumentStore>>> {
    match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory document store; documents are lost on restart");
            let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
            Ok(Some(store))
        }
        StoreBackend::Postgres => {
            let Some(database_url) = config.database_url.as_deref() else {
                warn!("DATABASE_URL is not set; document endpoints are unavailable");
                return Ok(None);
            };

            let store = PgDocumentStore::connect(
                database_url,
                config.database_name.as_deref(),
                config.max_connections,
            )?;

            match store.ping().await {
                Ok(()) => {
                    info!("Connected to PostgreSQL document store");
                    let collections = config.collections.iter().map(|(_, name)| name);
                    if let Err(e) = store.prepare(collections).await {
                        warn!("Could not prepare document collections: {}", e);
                    }
                }
                Err(e) => warn!("Document store not reachable at startup: {}", e),
            }

            let store: Arc<dyn DocumentStore> = Arc::new(store);
            Ok(Some(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
