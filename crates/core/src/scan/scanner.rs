use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::catalog::{CatalogStore, ModifiedMarker};
use crate::config::ScannerConfig;

use super::types::{NextArchive, ScanError, ScannedArchive};

fn is_ignored_name(name: &str) -> bool {
    name.starts_with('.') || name.starts_with("__")
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// `/`-joined relative path, `None` for non UTF-8 names.
fn to_slash_path(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(name) = component {
            parts.push(name.to_str()?);
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Archive id for a path relative to the scan root: the folders leading to
/// the file plus its stem, joined with `/`.
///
/// `mame/pacman.7z` becomes `mame/pacman`.
pub fn archive_id_for(relative: &Path) -> Option<String> {
    let stem = relative.file_stem()?.to_str()?;
    match relative.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => Some(format!("{}/{}", to_slash_path(parent)?, stem)),
        None => Some(stem.to_string()),
    }
}

/// Every regular file under `root` that is not hidden behind a `.`/`__`
/// name, as `(absolute path, relative slash path)`, sorted by path.
pub fn visible_files(root: &Path) -> Vec<(PathBuf, String)> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !is_ignored_name(&entry.file_name().to_string_lossy())
        });

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Failed to read entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        match to_slash_path(relative) {
            Some(relative) => files.push((entry.path().to_path_buf(), relative)),
            None => warn!(path = %entry.path().display(), "Skipping file with non UTF-8 name"),
        }
    }
    files
}

/// Walk `root` for archive files with one of `extensions`.
pub fn scan_archives(root: &Path, extensions: &[String]) -> Result<Vec<ScannedArchive>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }

    let mut archives = Vec::new();
    for (path, relative_path) in visible_files(root) {
        if !has_extension(&path, extensions) {
            continue;
        }
        let Some(archive_id) = archive_id_for(Path::new(&relative_path)) else {
            continue;
        };
        let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read modification time");
                continue;
            }
        };
        archives.push(ScannedArchive {
            archive_id,
            relative_path,
            path,
            last_modified: ModifiedMarker::from_system_time(modified),
        });
    }

    Ok(archives)
}

#[derive(Default)]
struct ScanState {
    /// Changed archives, popped from the back.
    pending: Vec<ScannedArchive>,
    /// Catalogued archives missing from the last walk.
    vanished: Vec<String>,
    last_scan: Option<Instant>,
}

/// Hands out archives whose file changed since they were catalogued.
///
/// The directory is walked again only once the queue is drained and the
/// rescan interval has elapsed since the previous walk.
pub struct ArchiveScanner {
    root: PathBuf,
    extensions: Vec<String>,
    rescan_interval: Duration,
    state: Mutex<ScanState>,
}

impl ArchiveScanner {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>, rescan_interval: Duration) -> Self {
        Self {
            root: root.into(),
            extensions,
            rescan_interval,
            state: Mutex::new(ScanState::default()),
        }
    }

    /// Scanner for the configured ROM folder, `None` when no folder is set.
    pub fn from_config(config: &ScannerConfig) -> Option<Self> {
        let root = config.rom_path.as_ref()?;
        Some(Self::new(
            root.clone(),
            config.extensions.clone(),
            Duration::from_secs(config.rescan_interval_secs),
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Next archive whose marker differs from the catalog's, walking the
    /// folder first if the queue is empty and a rescan is due.
    ///
    /// Blocks on filesystem access.
    pub fn next_changed(&self, catalog: &CatalogStore) -> Result<NextArchive, ScanError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let rescan_due = state
            .last_scan
            .map_or(true, |at| at.elapsed() >= self.rescan_interval);
        if state.pending.is_empty() && rescan_due {
            self.rescan(&mut state, catalog)?;
        }

        let archive = state.pending.pop();
        Ok(NextArchive {
            archive,
            remaining: state.pending.len(),
        })
    }

    /// Archive ids that were catalogued from disk but are gone from the last
    /// walk. Each id is handed out once.
    pub fn take_vanished(&self) -> Vec<String> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut state.vanished)
    }

    fn rescan(&self, state: &mut ScanState, catalog: &CatalogStore) -> Result<(), ScanError> {
        state.last_scan = Some(Instant::now());
        let archives = scan_archives(&self.root, &self.extensions)?;

        {
            let on_disk: HashSet<&str> = archives.iter().map(|a| a.archive_id.as_str()).collect();
            state.vanished = catalog
                .archive_ids()
                .into_iter()
                .filter(|id| !on_disk.contains(id.as_str()))
                .filter(|id| catalog.get_modified_marker(id).is_some())
                .collect();
        }

        let total = archives.len();
        let mut changed: Vec<ScannedArchive> = archives
            .into_iter()
            .filter(|a| catalog.get_modified_marker(&a.archive_id) != Some(a.last_modified))
            .collect();
        changed.reverse();

        info!(
            root = %self.root.display(),
            archives = total,
            changed = changed.len(),
            vanished = state.vanished.len(),
            "Scanned archive folder"
        );
        for archive in changed.iter().rev() {
            debug!(archive = %archive.archive_id, "Archive changed");
        }

        state.pending = changed;
        Ok(())
    }
}
