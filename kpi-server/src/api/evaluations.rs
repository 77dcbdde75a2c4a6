//! Evaluation endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::ApiResponse;
use shared::models::{
    Evaluation, EvaluationCreate, EvaluationDetail, EvaluationFilter, EvaluationUpdate, Score,
};
use shared::{PaginatedResponse, PaginationQuery};

use super::{ApiJson, ApiQuery, ApiResult};
use crate::auth::Identity;
use crate::state::AppState;

/// POST /api/evaluations
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ApiJson(data): ApiJson<EvaluationCreate>,
) -> ApiResult<EvaluationDetail> {
    let detail = state.workflow.create_evaluation(&identity, data).await?;
    Ok(Json(detail))
}

/// GET /api/evaluations
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<EvaluationFilter>,
    ApiQuery(page): ApiQuery<PaginationQuery>,
) -> ApiResult<PaginatedResponse<Evaluation>> {
    let result = state.workflow.list_evaluations(&filter, &page).await?;
    Ok(Json(result))
}

/// GET /api/evaluations/pending/count
pub async fn pending_count(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<serde_json::Value> {
    let count = state.workflow.pending_count(&identity).await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

/// GET /api/evaluations/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<EvaluationDetail> {
    Ok(Json(state.workflow.get_evaluation(id).await?))
}

/// PUT /api/evaluations/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
    ApiJson(data): ApiJson<EvaluationUpdate>,
) -> ApiResult<Evaluation> {
    let evaluation = state.workflow.update_evaluation(&identity, id, data).await?;
    Ok(Json(evaluation))
}

/// DELETE /api/evaluations/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> ApiResult<ApiResponse<()>> {
    state.workflow.delete_evaluation(&identity, id).await?;
    Ok(Json(ApiResponse::ok()))
}

/// GET /api/evaluations/{id}/scores
pub async fn list_scores(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Score>> {
    Ok(Json(state.workflow.list_scores(id).await?))
}

/// GET /api/employees/{id}/evaluations
pub async fn list_for_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<i64>,
) -> ApiResult<Vec<Evaluation>> {
    Ok(Json(
        state.workflow.list_employee_evaluations(employee_id).await?,
    ))
}

/// GET /api/employees/{id}/evaluations/pending
pub async fn list_pending(
    State(state): State<AppState>,
    Path(employee_id): Path<i64>,
) -> ApiResult<Vec<Evaluation>> {
    Ok(Json(
        state.workflow.list_pending_evaluations(employee_id).await?,
    ))
}
