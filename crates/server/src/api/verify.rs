//! Verification API handler.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use romcheck_core::{verify, CorrectionPlan};
use tracing::{debug, error};

use super::handlers::{internal_error, not_found, ApiError};
use crate::metrics::VERIFICATIONS_TOTAL;
use crate::state::AppState;

/// GET /api/v1/verify/{*archive}
///
/// Correction plan for a catalogued archive; `{}` when nothing is wrong.
pub async fn verify_archive(
    State(state): State<Arc<AppState>>,
    Path(archive_id): Path<String>,
) -> Result<Json<CorrectionPlan>, ApiError> {
    let Some(entry) = state.catalog().get(&archive_id) else {
        VERIFICATIONS_TOTAL
            .with_label_values(&["not_catalogued"])
            .inc();
        return Err(not_found(format!("Archive not catalogued: {}", archive_id)));
    };

    let matches = state.matcher().match_contents(&entry.files).map_err(|e| {
        error!(archive = %archive_id, "Set match failed: {}", e);
        internal_error(e)
    })?;

    let plan = verify(&archive_id, &entry.files, &matches).map_err(|e| {
        error!(archive = %archive_id, "Verification failed: {}", e);
        internal_error(e)
    })?;

    let outcome = if plan.is_clean() { "clean" } else { "findings" };
    VERIFICATIONS_TOTAL.with_label_values(&[outcome]).inc();
    debug!(archive = %archive_id, outcome, "Verified archive");

    Ok(Json(plan))
}
