use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use romcheck_core::{
    load_config, load_reference_file, validate_config, ArchiveHasher, ArchiveScanner,
    CatalogPersistence, CatalogStore, CatalogWorker, SevenZipHasher, SqliteCatalogPersistence,
};

use romcheck_server::api::create_router;
use romcheck_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("ROMCHECK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Reference path: {:?}", config.reference.path);
    info!("Catalog database: {:?}", config.catalog.database);

    // Load reference data (large file, off the async workers)
    let reference_path = config.reference.path.clone();
    let reference = tokio::task::spawn_blocking(move || load_reference_file(&reference_path))
        .await
        .context("Reference loader task failed")?
        .with_context(|| format!("Failed to load reference from {:?}", config.reference.path))?;
    let reference = Arc::new(reference);
    info!(
        records = reference.len(),
        version = config.reference.version.as_deref().unwrap_or("unknown"),
        "Reference index ready"
    );

    // Open catalog persistence and warm the in-memory store
    let persistence: Arc<dyn CatalogPersistence> = Arc::new(
        SqliteCatalogPersistence::new(&config.catalog.database)
            .context("Failed to open catalog database")?,
    );
    let catalog = Arc::new(CatalogStore::new());
    let loaded = catalog.load(
        persistence
            .load_all()
            .context("Failed to load catalog entries")?,
    );
    info!("Catalog loaded with {} archives", loaded);

    let mut state = AppState::new(
        config.clone(),
        Arc::clone(&reference),
        Arc::clone(&catalog),
        Arc::clone(&persistence),
    );

    // Scanner serves next_file; the worker additionally hashes in-process
    let mut worker = None;
    match ArchiveScanner::from_config(&config.scanner) {
        Some(scanner) => {
            let scanner = Arc::new(scanner);
            info!("Archive scanner watching {:?}", scanner.root());
            state = state.with_scanner(Arc::clone(&scanner));

            if config.scanner.enabled {
                let hasher = SevenZipHasher::new(config.hasher.clone());
                if let Err(e) = hasher.validate().await {
                    warn!("Archive hasher not usable: {}", e);
                }

                let w = Arc::new(CatalogWorker::new(
                    scanner,
                    Arc::new(hasher),
                    Arc::clone(&catalog),
                    Arc::clone(&persistence),
                    Duration::from_millis(config.scanner.poll_interval_ms),
                ));
                w.start();
                state = state.with_worker(Arc::clone(&w));
                worker = Some(w);
            } else {
                info!("Catalog worker disabled in config");
            }
        }
        None => info!("No ROM folder configured, scanner disabled"),
    }

    // Create router
    let app = create_router(Arc::new(state));

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // Stop worker if running
    if let Some(worker) = worker {
        worker.stop().await;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
}
