use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogPersistence, CatalogStore};
use crate::hasher::ArchiveHasher;
use crate::scan::ArchiveScanner;

use super::types::{ProcessOutcome, WorkerError};

/// Drives the scanner and hasher in a background task.
pub struct CatalogWorker {
    scanner: Arc<ArchiveScanner>,
    hasher: Arc<dyn ArchiveHasher>,
    catalog: Arc<CatalogStore>,
    persistence: Arc<dyn CatalogPersistence>,
    poll_interval: Duration,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl CatalogWorker {
    pub fn new(
        scanner: Arc<ArchiveScanner>,
        hasher: Arc<dyn ArchiveHasher>,
        catalog: Arc<CatalogStore>,
        persistence: Arc<dyn CatalogPersistence>,
        poll_interval: Duration,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            scanner,
            hasher,
            catalog,
            persistence,
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start the worker (spawns the background loop).
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Catalog worker already running");
            return;
        }

        info!(
            root = %self.scanner.root().display(),
            hasher = self.hasher.name(),
            "Starting catalog worker"
        );
        self.spawn_loop();
    }

    /// Stop the worker. An archive being hashed is finished first.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Catalog worker not running");
            return;
        }

        info!("Stopping catalog worker");
        let _ = self.shutdown_tx.send(());

        // Give the loop a moment to notice
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Catalog worker stopped");
    }

    /// Run a single step: handle vanished archives, then hash the next
    /// changed one if there is one.
    pub async fn process_one(&self) -> Result<ProcessOutcome, WorkerError> {
        Self::step(&self.scanner, &self.hasher, &self.catalog, &self.persistence).await
    }

    fn spawn_loop(&self) {
        let running = Arc::clone(&self.running);
        let scanner = Arc::clone(&self.scanner);
        let hasher = Arc::clone(&self.hasher);
        let catalog = Arc::clone(&self.catalog);
        let persistence = Arc::clone(&self.persistence);
        let poll_interval = self.poll_interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Catalog worker loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Catalog worker received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        // Drain the queue before sleeping again.
                        while running.load(Ordering::Relaxed) {
                            match Self::step(&scanner, &hasher, &catalog, &persistence).await {
                                Ok(ProcessOutcome::Idle) => break,
                                Ok(outcome) => debug!(?outcome, "Catalog worker step"),
                                Err(e) => {
                                    warn!("Catalog worker error: {}", e);
                                    break;
                                }
                            }
                        }
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                    }
                }
            }
            info!("Catalog worker loop stopped");
        });
    }

    async fn step(
        scanner: &Arc<ArchiveScanner>,
        hasher: &Arc<dyn ArchiveHasher>,
        catalog: &Arc<CatalogStore>,
        persistence: &Arc<dyn CatalogPersistence>,
    ) -> Result<ProcessOutcome, WorkerError> {
        let next = {
            let scanner = Arc::clone(scanner);
            let catalog = Arc::clone(catalog);
            tokio::task::spawn_blocking(move || scanner.next_changed(&catalog))
                .await
                .map_err(|e| WorkerError::Internal(e.to_string()))??
        };

        for archive_id in scanner.take_vanished() {
            if catalog
                .commit_remove(&archive_id, persistence.as_ref())?
                .is_some()
            {
                info!(archive = %archive_id, "Removed vanished archive from catalog");
            }
        }

        let Some(archive) = next.archive else {
            return Ok(ProcessOutcome::Idle);
        };

        let files = match hasher.hash_archive(&archive.path).await {
            Ok(files) => files,
            Err(e) => {
                warn!(archive = %archive.archive_id, error = %e, "Failed to hash archive");
                return Ok(ProcessOutcome::Failed {
                    archive_id: archive.archive_id,
                    error: e.to_string(),
                });
            }
        };

        let file_count = files.len();
        catalog.commit_replace(
            &archive.archive_id,
            files,
            Some(archive.last_modified),
            persistence.as_ref(),
        )?;

        info!(
            archive = %archive.archive_id,
            files = file_count,
            remaining = next.remaining,
            "Catalogued archive"
        );

        Ok(ProcessOutcome::Catalogued {
            archive_id: archive.archive_id,
            files: file_count,
            remaining: next.remaining,
        })
    }
}
