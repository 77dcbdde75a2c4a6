//! HTTP API

pub mod evaluations;
pub mod events;
mod extract;
pub mod health;
pub mod invitations;
pub mod scores;

pub use extract::{ApiJson, ApiQuery};

use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use shared::error::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::auth_middleware;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Bearer-authenticated API
    let api = Router::new()
        .route(
            "/api/evaluations",
            post(evaluations::create).get(evaluations::list),
        )
        .route(
            "/api/evaluations/pending/count",
            get(evaluations::pending_count),
        )
        .route(
            "/api/evaluations/{id}",
            get(evaluations::get)
                .put(evaluations::update)
                .delete(evaluations::delete),
        )
        .route("/api/evaluations/{id}/scores", get(evaluations::list_scores))
        .route(
            "/api/evaluations/{id}/invitations",
            post(invitations::create).get(invitations::list_for_evaluation),
        )
        .route(
            "/api/employees/{id}/evaluations",
            get(evaluations::list_for_employee),
        )
        .route(
            "/api/employees/{id}/evaluations/pending",
            get(evaluations::list_pending),
        )
        .route("/api/scores/{id}/self", put(scores::update_self))
        .route("/api/scores/{id}/manager", put(scores::update_manager))
        .route("/api/scores/{id}/hr", put(scores::update_hr))
        .route("/api/scores/{id}/final", put(scores::update_final))
        .route("/api/invitations/my", get(invitations::list_mine))
        .route(
            "/api/invitations/pending/count",
            get(invitations::pending_count),
        )
        .route(
            "/api/invitations/{id}",
            get(invitations::get).delete(invitations::delete),
        )
        .route("/api/invitations/{id}/scores", get(invitations::list_scores))
        .route("/api/invitations/{id}/accept", put(invitations::accept))
        .route("/api/invitations/{id}/decline", put(invitations::decline))
        .route("/api/invitations/{id}/complete", put(invitations::complete))
        .route("/api/invitations/{id}/cancel", put(invitations::cancel))
        .route("/api/invitations/{id}/reinvite", put(invitations::reinvite))
        .route("/api/invited-scores/{id}", put(invitations::update_score))
        .route("/api/events/status", get(events::status))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        // token travels in the query string
        .route("/api/events", get(events::stream))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
