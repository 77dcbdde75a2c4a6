//! Invitation Model
//!
//! HR invites colleagues to score an evaluation that has passed manager review.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Invitation lifecycle
///
/// ```text
/// pending ──accept──▶ accepted ──complete──▶ completed
///    │  ▲
///    │  └──reinvite── declined ◀──decline── pending
///    └──cancel──▶ cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "invitation_status", rename_all = "snake_case")
)]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Completed,
    Cancelled,
}

impl InvitationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "awaiting response",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether `self → next` is a legal lifecycle step
    pub const fn can_transition_to(&self, next: InvitationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Accepted)
                | (Self::Pending, Self::Declined)
                | (Self::Pending, Self::Cancelled)
                | (Self::Accepted, Self::Completed)
                | (Self::Declined, Self::Pending)
        )
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Invitation {
    pub id: i64,
    pub evaluation_id: i64,
    pub inviter_id: i64,
    pub invitee_id: i64,
    pub status: InvitationStatus,
    pub message: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create invitations payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationCreate {
    pub invitee_ids: Vec<i64>,
    #[serde(default)]
    pub message: String,
}

/// List filter for "my invitations"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvitationFilter {
    pub status: Option<InvitationStatus>,
}

/// One invitee's score for one template item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InvitedScore {
    pub id: i64,
    pub invitation_id: i64,
    pub item_id: i64,
    pub score: Option<f64>,
    pub comment: String,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvitedScoreUpdate {
    pub score: Option<f64>,
    #[serde(default)]
    pub comment: String,
}

/// Invitation together with its score rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationDetail {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub scores: Vec<InvitedScore>,
}
