//! Live message envelope
//!
//! Every frame pushed over a user's event stream is a [`LiveMessage`]:
//!
//! ```json
//! { "type": "evaluation_status_changed", "data": { ... },
//!   "timestamp": "2024-03-01T08:00:00Z", "id": "evaluation_status_changed-1709280000000000000" }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain event types fanned out to affected users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    EvaluationCreated,
    EvaluationUpdated,
    EvaluationDeleted,
    EvaluationStatusChanged,
    InvitationCreated,
    InvitationUpdated,
    InvitationDeleted,
    InvitationStatusChanged,
    InvitedScoreUpdated,
    SelfScoreUpdated,
    ManagerScoreUpdated,
    HrScoreUpdated,
    FinalScoreUpdated,
}

impl EventType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::EvaluationCreated => "evaluation_created",
            EventType::EvaluationUpdated => "evaluation_updated",
            EventType::EvaluationDeleted => "evaluation_deleted",
            EventType::EvaluationStatusChanged => "evaluation_status_changed",
            EventType::InvitationCreated => "invitation_created",
            EventType::InvitationUpdated => "invitation_updated",
            EventType::InvitationDeleted => "invitation_deleted",
            EventType::InvitationStatusChanged => "invitation_status_changed",
            EventType::InvitedScoreUpdated => "invited_score_updated",
            EventType::SelfScoreUpdated => "self_score_updated",
            EventType::ManagerScoreUpdated => "manager_score_updated",
            EventType::HrScoreUpdated => "hr_score_updated",
            EventType::FinalScoreUpdated => "final_score_updated",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const CONNECTED: &str = "connected";
pub const HEARTBEAT: &str = "heartbeat";

/// Envelope for everything written to an event stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
    /// RFC 3339
    pub timestamp: String,
    pub id: String,
}

impl LiveMessage {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        let now = Utc::now();
        let kind = kind.into();
        let nanos = now.timestamp_nanos_opt().unwrap_or_default();
        Self {
            id: format!("{kind}-{nanos}"),
            timestamp: now.to_rfc3339(),
            kind,
            data,
        }
    }

    /// First frame on every new connection
    pub fn connected(user_id: i64, connection_id: &str) -> Self {
        Self::new(
            CONNECTED,
            serde_json::json!({
                "user_id": user_id,
                "connection_id": connection_id,
                "timestamp": Utc::now().timestamp(),
            }),
        )
    }

    pub fn heartbeat() -> Self {
        Self::new(
            HEARTBEAT,
            serde_json::json!({ "timestamp": Utc::now().timestamp() }),
        )
    }

    pub fn event(event_type: EventType, data: &NotificationData) -> Self {
        Self::new(
            event_type.as_str(),
            serde_json::to_value(data).unwrap_or_default(),
        )
    }
}

/// `data` of a domain-event message, personalised per recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationData {
    /// Id of the entity the event is about
    pub id: i64,
    /// Employee whose evaluation is affected
    pub employee_id: i64,
    pub operator_id: i64,
    pub operator_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}
