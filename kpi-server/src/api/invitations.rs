//! Invitation endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::ApiResponse;
use shared::models::{
    Invitation, InvitationCreate, InvitationDetail, InvitationFilter, InvitedScore,
    InvitedScoreUpdate,
};
use shared::{PaginatedResponse, PaginationQuery};

use super::{ApiJson, ApiQuery, ApiResult};
use crate::auth::Identity;
use crate::state::AppState;

/// POST /api/evaluations/{id}/invitations
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(evaluation_id): Path<i64>,
    ApiJson(data): ApiJson<InvitationCreate>,
) -> ApiResult<Vec<Invitation>> {
    let created = state
        .invitations
        .create(&identity, evaluation_id, data)
        .await?;
    Ok(Json(created))
}

/// GET /api/evaluations/{id}/invitations
pub async fn list_for_evaluation(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(evaluation_id): Path<i64>,
) -> ApiResult<Vec<Invitation>> {
    let invitations = state
        .invitations
        .list_for_evaluation(&identity, evaluation_id)
        .await?;
    Ok(Json(invitations))
}

/// GET /api/invitations/my
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiQuery(filter): ApiQuery<InvitationFilter>,
    ApiQuery(page): ApiQuery<PaginationQuery>,
) -> ApiResult<PaginatedResponse<Invitation>> {
    let result = state
        .invitations
        .list_mine(&identity, &filter, &page)
        .await?;
    Ok(Json(result))
}

/// GET /api/invitations/pending/count
pub async fn pending_count(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<serde_json::Value> {
    let count = state.invitations.pending_count(&identity).await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

/// GET /api/invitations/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> ApiResult<InvitationDetail> {
    Ok(Json(state.invitations.get_details(&identity, id).await?))
}

/// DELETE /api/invitations/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<()>> {
    state.invitations.delete(&identity, id).await?;
    Ok(Json(ApiResponse::ok()))
}

/// GET /api/invitations/{id}/scores
pub async fn list_scores(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<InvitedScore>> {
    Ok(Json(state.invitations.list_scores(&identity, id).await?))
}

/// PUT /api/invitations/{id}/accept
pub async fn accept(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> ApiResult<Invitation> {
    Ok(Json(state.invitations.accept(&identity, id).await?))
}

/// PUT /api/invitations/{id}/decline
pub async fn decline(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> ApiResult<Invitation> {
    Ok(Json(state.invitations.decline(&identity, id).await?))
}

/// PUT /api/invitations/{id}/complete
pub async fn complete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> ApiResult<Invitation> {
    Ok(Json(state.invitations.complete(&identity, id).await?))
}

/// PUT /api/invitations/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> ApiResult<Invitation> {
    Ok(Json(state.invitations.cancel(&identity, id).await?))
}

/// PUT /api/invitations/{id}/reinvite
pub async fn reinvite(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> ApiResult<Invitation> {
    Ok(Json(state.invitations.reinvite(&identity, id).await?))
}

/// PUT /api/invited-scores/{id}
pub async fn update_score(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    ApiJson(data): ApiJson<InvitedScoreUpdate>,
) -> ApiResult<InvitedScore> {
    let score = state
        .invitations
        .update_invited_score(&identity, id, data)
        .await?;
    Ok(Json(score))
}
