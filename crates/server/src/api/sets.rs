//! Set matching API handler.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{extract::State, Json};
use romcheck_core::MatchResult;
use tracing::error;

use super::handlers::{internal_error, ApiError};
use crate::metrics::SET_MATCH_QUERIES_TOTAL;
use crate::state::AppState;

/// POST /api/v1/sets
///
/// Body: list of checksums. Returns every reference archive touched by the
/// list, split into matched/missing, plus the checksums nobody owns.
pub async fn match_sets(
    State(state): State<Arc<AppState>>,
    Json(checksums): Json<Vec<String>>,
) -> Result<Json<MatchResult>, ApiError> {
    SET_MATCH_QUERIES_TOTAL.inc();

    let query: BTreeSet<String> = checksums.iter().map(|c| c.to_lowercase()).collect();
    state.matcher().match_checksums(&query).map(Json).map_err(|e| {
        error!("Set match failed: {}", e);
        internal_error(e)
    })
}
