//! Reference data API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use romcheck_core::{ArchiveContents, RomRecord};
use serde::Serialize;

use super::handlers::{not_found, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReferenceInfoResponse {
    pub version: Option<String>,
    pub checksum_count: usize,
    pub archive_count: usize,
    pub record_count: usize,
}

#[derive(Debug, Serialize)]
pub struct RomsResponse {
    pub roms: Vec<RomRecord>,
}

/// GET /api/v1/reference
pub async fn get_info(State(state): State<Arc<AppState>>) -> Json<ReferenceInfoResponse> {
    let stats = state.reference().stats();
    Json(ReferenceInfoResponse {
        version: state.config().reference.version.clone(),
        checksum_count: stats.checksum_count,
        archive_count: stats.archive_count,
        record_count: stats.record_count,
    })
}

/// GET /api/v1/reference/archives
pub async fn list_archives(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(
        state
            .reference()
            .archive_ids()
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

/// GET /api/v1/reference/checksum/{checksum}
///
/// Every record carrying the checksum.
pub async fn get_checksum(
    State(state): State<Arc<AppState>>,
    Path(checksum): Path<String>,
) -> Result<Json<RomsResponse>, ApiError> {
    let checksum = checksum.to_lowercase();
    match state.reference().by_checksum(&checksum) {
        Some(records) => Ok(Json(RomsResponse {
            roms: records.iter().cloned().collect(),
        })),
        None => Err(not_found(format!("Unknown checksum: {}", checksum))),
    }
}

/// GET /api/v1/reference/archive/{*archive}
///
/// Reference contents of an archive: checksum -> file name.
pub async fn get_archive(
    State(state): State<Arc<AppState>>,
    Path(archive_id): Path<String>,
) -> Result<Json<ArchiveContents>, ApiError> {
    state
        .reference()
        .archive_files(&archive_id)
        .map(Json)
        .ok_or_else(|| not_found(format!("Unknown archive: {}", archive_id)))
}
