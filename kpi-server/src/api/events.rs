//! Server-sent event stream
//!
//! Browsers' `EventSource` cannot set headers, so the stream endpoint takes
//! its token from the query string and sits outside the auth middleware.

use std::convert::Infallible;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use shared::LiveMessage;
use shared::error::AppError;

use super::ApiResult;
use crate::auth::{Identity, verify_token};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub token: Option<String>,
}

fn to_event(message: &LiveMessage) -> Event {
    Event::default()
        .event(message.kind.clone())
        .id(message.id.clone())
        .json_data(message)
        .unwrap_or_else(|e| {
            tracing::warn!(message_id = %message.id, error = %e, "Live message not serializable");
            Event::default().comment("dropped")
        })
}

/// GET /api/events?token=<JWT>
pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(AppError::not_authenticated)?;
    let identity = verify_token(&token, &state.jwt_secret)?;

    let connection = state.live.register(identity.user_id);
    tracing::info!(
        user_id = connection.user_id(),
        connection_id = %connection.id(),
        "Live stream opened"
    );

    let events = connection
        .into_stream()
        .map(|message| Ok::<_, Infallible>(to_event(&message)));
    Ok(Sse::new(events))
}

/// GET /api/events/status
pub async fn status(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<serde_json::Value> {
    let stats = state.live.stats();
    Ok(Json(serde_json::json!({
        "user_id": identity.user_id,
        "is_online": state.live.is_online(identity.user_id),
        "user_connection_count": state.live.user_connection_count(identity.user_id),
        "online_users": stats.online_users,
        "total_connections": stats.total_connections,
    })))
}
