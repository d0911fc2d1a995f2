use std::sync::Arc;

use romcheck_core::{
    ArchiveScanner, CatalogPersistence, CatalogStore, CatalogWorker, Config, ReferenceIndex,
    SetMatcher,
};

/// Shared application state
pub struct AppState {
    config: Config,
    matcher: SetMatcher,
    catalog: Arc<CatalogStore>,
    persistence: Arc<dyn CatalogPersistence>,
    scanner: Option<Arc<ArchiveScanner>>,
    worker: Option<Arc<CatalogWorker>>,
}

impl AppState {
    pub fn new(
        config: Config,
        reference: Arc<ReferenceIndex>,
        catalog: Arc<CatalogStore>,
        persistence: Arc<dyn CatalogPersistence>,
    ) -> Self {
        Self {
            config,
            matcher: SetMatcher::new(reference),
            catalog,
            persistence,
            scanner: None,
            worker: None,
        }
    }

    /// Attach the archive scanner backing `next_file`.
    pub fn with_scanner(mut self, scanner: Arc<ArchiveScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Attach the background catalog worker.
    pub fn with_worker(mut self, worker: Arc<CatalogWorker>) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn matcher(&self) -> &SetMatcher {
        &self.matcher
    }

    pub fn reference(&self) -> &ReferenceIndex {
        self.matcher.reference()
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    pub fn persistence(&self) -> &dyn CatalogPersistence {
        self.persistence.as_ref()
    }

    pub fn scanner(&self) -> Option<&Arc<ArchiveScanner>> {
        self.scanner.as_ref()
    }

    pub fn worker(&self) -> Option<&Arc<CatalogWorker>> {
        self.worker.as_ref()
    }
}
