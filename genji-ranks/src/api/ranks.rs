//! Player rank endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use genji_common::models::UserId;
use serde::Serialize;

use super::ApiResult;
use crate::ranks::{RankPreview, ReconcileOutcome};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LastSubmissionResponse {
    pub user_id: UserId,
    pub last_submission: Option<DateTime<Utc>>,
}

/// GET /api/players/:id/ranks
///
/// Current completion counts and computed ranks; grants and cache untouched.
pub async fn get_ranks(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<RankPreview>> {
    Ok(Json(state.ranks.preview(user_id).await?))
}

/// POST /api/players/:id/ranks/sync
pub async fn sync_ranks(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<ReconcileOutcome>> {
    Ok(Json(state.ranks.sync_player(user_id).await?))
}

/// GET /api/players/:id/submissions/latest
///
/// Used by the front-end to enforce the submission cooldown.
pub async fn get_last_submission(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<LastSubmissionResponse>> {
    let last_submission = state.maps.last_submission(user_id).await?;
    Ok(Json(LastSubmissionResponse {
        user_id,
        last_submission,
    }))
}
