//! Catalog API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use romcheck_core::{ArchiveContents, CatalogEntry, CatalogStats, ModifiedMarker, RomRecord};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::handlers::{api_error, internal_error, not_found, ApiError};
use super::reference::RomsResponse;
use crate::metrics::CATALOG_CHANGES_TOTAL;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CatalogInfoResponse {
    #[serde(flatten)]
    pub stats: CatalogStats,
    pub scanner_configured: bool,
    pub worker_running: bool,
}

#[derive(Debug, Deserialize)]
pub struct PutArchiveParams {
    /// Marker of the archive file the contents were hashed from.
    #[serde(default)]
    pub last_modified: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct NextFileResponse {
    /// Path relative to the ROM folder, `null` when nothing changed.
    pub file: Option<String>,
    pub archive_id: Option<String>,
    pub last_modified: Option<ModifiedMarker>,
    pub remaining: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/catalog
pub async fn get_info(State(state): State<Arc<AppState>>) -> Json<CatalogInfoResponse> {
    Json(CatalogInfoResponse {
        stats: state.catalog().stats(),
        scanner_configured: state.scanner().is_some(),
        worker_running: state.worker().map(|w| w.is_running()).unwrap_or(false),
    })
}

/// GET /api/v1/catalog/archive/{*archive}
///
/// Observed contents of an archive: checksum -> file name.
pub async fn get_archive(
    State(state): State<Arc<AppState>>,
    Path(archive_id): Path<String>,
) -> Result<Json<ArchiveContents>, ApiError> {
    state
        .catalog()
        .get(&archive_id)
        .map(|entry| Json(entry.files))
        .ok_or_else(|| not_found(format!("Archive not catalogued: {}", archive_id)))
}

/// PUT /api/v1/catalog/archive/{*archive}?last_modified=<marker>
///
/// Replace the archive's contents wholesale and persist them.
pub async fn put_archive(
    State(state): State<Arc<AppState>>,
    Path(archive_id): Path<String>,
    Query(params): Query<PutArchiveParams>,
    Json(files): Json<ArchiveContents>,
) -> Result<Json<CatalogEntry>, ApiError> {
    let files: ArchiveContents = files
        .into_iter()
        .map(|(checksum, file)| (checksum.to_lowercase(), file))
        .collect();
    let file_count = files.len();

    let entry = state
        .catalog()
        .commit_replace(
            &archive_id,
            files,
            params.last_modified.map(ModifiedMarker),
            state.persistence(),
        )
        .map_err(|e| {
            error!(archive = %archive_id, "Failed to persist catalog entry: {}", e);
            internal_error(e)
        })?;
    CATALOG_CHANGES_TOTAL.with_label_values(&["replace"]).inc();
    info!(archive = %archive_id, files = file_count, "Catalog entry replaced");

    Ok(Json(entry))
}

/// DELETE /api/v1/catalog/archive/{*archive}
pub async fn delete_archive(
    State(state): State<Arc<AppState>>,
    Path(archive_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let removed = state
        .catalog()
        .commit_remove(&archive_id, state.persistence())
        .map_err(|e| {
            error!(archive = %archive_id, "Failed to delete catalog entry: {}", e);
            internal_error(e)
        })?;
    if removed.is_none() {
        return Err(not_found(format!("Archive not catalogued: {}", archive_id)));
    }
    CATALOG_CHANGES_TOTAL.with_label_values(&["remove"]).inc();
    info!(archive = %archive_id, "Catalog entry removed");

    Ok(Json(SuccessResponse {
        message: format!("Removed {}", archive_id),
    }))
}

/// GET /api/v1/catalog/checksum/{checksum}
///
/// Where the checksum currently lives on disk.
pub async fn get_checksum(
    State(state): State<Arc<AppState>>,
    Path(checksum): Path<String>,
) -> Result<Json<RomsResponse>, ApiError> {
    let checksum = checksum.to_lowercase();
    let roms: Vec<RomRecord> = state.catalog().by_checksum(&checksum);
    if roms.is_empty() {
        return Err(not_found(format!("Checksum not catalogued: {}", checksum)));
    }
    Ok(Json(RomsResponse { roms }))
}

/// GET /api/v1/catalog/next_file
///
/// Next archive whose file changed since it was catalogued.
pub async fn next_file(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NextFileResponse>, ApiError> {
    let Some(scanner) = state.scanner().cloned() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Scanner not configured",
        ));
    };

    let catalog = Arc::clone(state.catalog());
    let next = tokio::task::spawn_blocking(move || scanner.next_changed(&catalog))
        .await
        .map_err(internal_error)?
        .map_err(|e| {
            error!("Scan failed: {}", e);
            internal_error(e)
        })?;

    Ok(Json(match next.archive {
        Some(archive) => NextFileResponse {
            file: Some(archive.relative_path),
            archive_id: Some(archive.archive_id),
            last_modified: Some(archive.last_modified),
            remaining: next.remaining,
        },
        None => NextFileResponse {
            file: None,
            archive_id: None,
            last_modified: None,
            remaining: next.remaining,
        },
    }))
}
