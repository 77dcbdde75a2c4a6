//! Score column endpoints: PUT /api/scores/{id}/self|manager|hr|final

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::models::{Score, ScoreField, ScoreUpdate};

use super::{ApiJson, ApiResult};
use crate::auth::Identity;
use crate::state::AppState;

async fn update(
    state: AppState,
    identity: Identity,
    id: i64,
    field: ScoreField,
    data: ScoreUpdate,
) -> ApiResult<Score> {
    let score = state
        .workflow
        .update_score(&identity, id, field, data)
        .await?;
    Ok(Json(score))
}

pub async fn update_self(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    ApiJson(data): ApiJson<ScoreUpdate>,
) -> ApiResult<Score> {
    update(state, identity, id, ScoreField::SelfReview, data).await
}

pub async fn update_manager(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    ApiJson(data): ApiJson<ScoreUpdate>,
) -> ApiResult<Score> {
    update(state, identity, id, ScoreField::Manager, data).await
}

pub async fn update_hr(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    ApiJson(data): ApiJson<ScoreUpdate>,
) -> ApiResult<Score> {
    update(state, identity, id, ScoreField::Hr, data).await
}

pub async fn update_final(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    ApiJson(data): ApiJson<ScoreUpdate>,
) -> ApiResult<Score> {
    update(state, identity, id, ScoreField::Final, data).await
}
