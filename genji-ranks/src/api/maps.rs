//! Map write endpoints
//!
//! Each write answers once its transaction commits; the player resync it
//! triggers keeps running in the background.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use genji_common::models::{MedalThresholds, UserId};
use serde::{Deserialize, Serialize};

use super::ApiResult;
use crate::maps::{MapInfo, Submission, SubmissionReceipt};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitMapRequest {
    pub creator: Option<UserId>,
    pub map_code: Option<String>,
    pub map_name: Option<String>,
    pub checkpoints: Option<i64>,
    pub description: Option<String>,
    #[serde(default)]
    pub map_types: Vec<String>,
    #[serde(default)]
    pub mechanics: Vec<String>,
    #[serde(default)]
    pub restrictions: Vec<String>,
    #[serde(default)]
    pub guides: Vec<String>,
    #[serde(default)]
    pub medals: MedalThresholds,
    pub difficulty: Option<String>,
    /// Staff submissions are official immediately
    #[serde(default)]
    pub privileged: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitMapResponse {
    #[serde(flatten)]
    pub receipt: SubmissionReceipt,
    /// Players queued for rank resync
    pub resync: Vec<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct RateMapRequest {
    pub user_id: UserId,
    pub difficulty: f64,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub archived: bool,
}

#[derive(Debug, Serialize)]
pub struct MapUpdateResponse {
    pub map_code: String,
    pub resync: Vec<UserId>,
}

/// POST /api/maps
pub async fn submit_map(
    State(state): State<AppState>,
    Json(request): Json<SubmitMapRequest>,
) -> ApiResult<(StatusCode, Json<SubmitMapResponse>)> {
    let mut builder = Submission::builder()
        .description(request.description)
        .map_types(request.map_types)
        .mechanics(request.mechanics)
        .restrictions(request.restrictions)
        .guides(request.guides)
        .medals(request.medals);
    if let Some(creator) = request.creator {
        builder = builder.creator(creator);
    }
    if let Some(code) = request.map_code {
        builder = builder.map_code(code);
    }
    if let Some(name) = request.map_name {
        builder = builder.map_name(name);
    }
    if let Some(checkpoints) = request.checkpoints {
        builder = builder.checkpoints(checkpoints);
    }
    if let Some(difficulty) = request.difficulty {
        builder = builder.difficulty(difficulty);
    }

    let submission = builder.build(state.ranks.table())?;
    let (receipt, fan_out) = state.maps.submit(&submission, request.privileged).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitMapResponse {
            receipt,
            resync: fan_out.players().to_vec(),
        }),
    ))
}

/// GET /api/maps/:code
pub async fn get_map(
    State(state): State<AppState>,
    Path(map_code): Path<String>,
) -> ApiResult<Json<MapInfo>> {
    let info = state.maps.map_info(&map_code.to_uppercase()).await?;
    Ok(Json(info))
}

/// POST /api/maps/:code/ratings
pub async fn rate_map(
    State(state): State<AppState>,
    Path(map_code): Path<String>,
    Json(request): Json<RateMapRequest>,
) -> ApiResult<Json<MapUpdateResponse>> {
    let map_code = map_code.to_uppercase();
    let fan_out = state
        .maps
        .rate_map(&map_code, request.user_id, request.difficulty)
        .await?;

    Ok(Json(MapUpdateResponse {
        map_code,
        resync: fan_out.players().to_vec(),
    }))
}

/// PUT /api/maps/:code/archived
pub async fn set_archived(
    State(state): State<AppState>,
    Path(map_code): Path<String>,
    Json(request): Json<ArchiveRequest>,
) -> ApiResult<Json<MapUpdateResponse>> {
    let map_code = map_code.to_uppercase();
    let fan_out = state.maps.set_archived(&map_code, request.archived).await?;

    Ok(Json(MapUpdateResponse {
        map_code,
        resync: fan_out.players().to_vec(),
    }))
}
