//! Evaluation store
//!
//! The workflow, invitation and notification services only see the
//! [`EvaluationStore`] trait. Production runs on [`PgStore`]; tests run on
//! the in-memory double in [`memory`].
//!
//! Multi-row writes (evaluation creation, invitation batches, cascade deletes,
//! evaluation updates with score side effects) are single store calls so each
//! one commits or rolls back as a unit.

pub mod employees;
pub mod evaluations;
pub mod invitations;
pub mod scores;
pub mod templates;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use shared::PaginationQuery;
use shared::models::{
    Employee, Evaluation, EvaluationCreate, EvaluationFilter, EvaluationStatus, Invitation,
    InvitationFilter, InvitationStatus, InvitedScore, InvitedScoreUpdate, KpiItem, KpiTemplate,
    Role, Score, ScoreField, ScoreUpdate,
};
use sqlx::PgPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepoError::NotFound("row not found".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.message().to_string())
            }
            other => RepoError::Database(other.to_string()),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Manager scores copied from self scores, with the marker comment
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerFill {
    pub comment: String,
    /// (score id, value copied from self_score)
    pub scores: Vec<(i64, f64)>,
}

/// Evaluation write applied in one transaction
///
/// The workflow engine computes every value; the store only persists them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationPatch {
    pub status: Option<EvaluationStatus>,
    pub final_comment: Option<String>,
    pub total_score: Option<f64>,
    pub manager_fill: Option<ManagerFill>,
    /// (score id, final score)
    pub final_scores: Vec<(i64, f64)>,
}

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    // ── employees & templates ────────────────────────────────────────

    async fn find_employee(&self, id: i64) -> RepoResult<Option<Employee>>;

    /// Ids of every active employee holding `role`
    async fn list_employee_ids_by_role(&self, role: Role) -> RepoResult<Vec<i64>>;

    async fn find_template(&self, id: i64) -> RepoResult<Option<KpiTemplate>>;

    async fn list_template_items(&self, template_id: i64) -> RepoResult<Vec<KpiItem>>;

    // ── evaluations ──────────────────────────────────────────────────

    /// Insert an evaluation plus one empty score per item.
    ///
    /// Returns [`RepoError::Duplicate`] when the (employee, template, period)
    /// tuple already has an evaluation.
    async fn create_evaluation(
        &self,
        data: &EvaluationCreate,
        item_ids: &[i64],
    ) -> RepoResult<Evaluation>;

    async fn find_evaluation(&self, id: i64) -> RepoResult<Option<Evaluation>>;

    /// One page of evaluations, newest first, plus the unpaged total
    async fn list_evaluations(
        &self,
        filter: &EvaluationFilter,
        page: &PaginationQuery,
    ) -> RepoResult<(Vec<Evaluation>, u64)>;

    /// Evaluations of one employee; an empty `statuses` slice means all
    async fn list_employee_evaluations(
        &self,
        employee_id: i64,
        statuses: &[EvaluationStatus],
    ) -> RepoResult<Vec<Evaluation>>;

    async fn count_evaluations(&self, employee_id: i64, status: EvaluationStatus)
    -> RepoResult<u64>;

    async fn update_evaluation(&self, id: i64, patch: &EvaluationPatch) -> RepoResult<Evaluation>;

    /// Delete an evaluation with its invited scores, invitations and scores
    async fn delete_evaluation(&self, id: i64) -> RepoResult<()>;

    // ── scores ───────────────────────────────────────────────────────

    async fn find_score(&self, id: i64) -> RepoResult<Option<Score>>;

    async fn list_scores(&self, evaluation_id: i64) -> RepoResult<Vec<Score>>;

    /// Overwrite one column pair of a score row.
    ///
    /// A manager update clears `manager_auto`.
    async fn update_score(
        &self,
        id: i64,
        field: ScoreField,
        update: &ScoreUpdate,
    ) -> RepoResult<Score>;

    // ── invitations ──────────────────────────────────────────────────

    /// Create one pending invitation (plus one empty invited score per item)
    /// for every invitee not yet invited to the evaluation.
    ///
    /// Returns only the invitations created by this call.
    async fn create_invitations(
        &self,
        evaluation_id: i64,
        inviter_id: i64,
        invitee_ids: &[i64],
        message: &str,
        item_ids: &[i64],
    ) -> RepoResult<Vec<Invitation>>;

    async fn find_invitation(&self, id: i64) -> RepoResult<Option<Invitation>>;

    async fn list_invitations(&self, evaluation_id: i64) -> RepoResult<Vec<Invitation>>;

    async fn list_invitee_invitations(
        &self,
        invitee_id: i64,
        filter: &InvitationFilter,
        page: &PaginationQuery,
    ) -> RepoResult<(Vec<Invitation>, u64)>;

    async fn count_invitations(&self, invitee_id: i64, status: InvitationStatus)
    -> RepoResult<u64>;

    /// Move an invitation from `from` to `to`.
    ///
    /// `None` when the invitation is not in `from` any more.
    async fn transition_invitation(
        &self,
        id: i64,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> RepoResult<Option<Invitation>>;

    /// Delete an invitation with its invited scores
    async fn delete_invitation(&self, id: i64) -> RepoResult<()>;

    async fn find_invited_score(&self, id: i64) -> RepoResult<Option<InvitedScore>>;

    async fn list_invited_scores(&self, invitation_id: i64) -> RepoResult<Vec<InvitedScore>>;

    async fn update_invited_score(
        &self,
        id: i64,
        update: &InvitedScoreUpdate,
    ) -> RepoResult<InvitedScore>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvaluationStore for PgStore {
    async fn find_employee(&self, id: i64) -> RepoResult<Option<Employee>> {
        Ok(employees::find_by_id(&self.pool, id).await?)
    }

    async fn list_employee_ids_by_role(&self, role: Role) -> RepoResult<Vec<i64>> {
        Ok(employees::list_ids_by_role(&self.pool, role).await?)
    }

    async fn find_template(&self, id: i64) -> RepoResult<Option<KpiTemplate>> {
        Ok(templates::find_by_id(&self.pool, id).await?)
    }

    async fn list_template_items(&self, template_id: i64) -> RepoResult<Vec<KpiItem>> {
        Ok(templates::list_items(&self.pool, template_id).await?)
    }

    async fn create_evaluation(
        &self,
        data: &EvaluationCreate,
        item_ids: &[i64],
    ) -> RepoResult<Evaluation> {
        evaluations::create(&self.pool, data, item_ids).await
    }

    async fn find_evaluation(&self, id: i64) -> RepoResult<Option<Evaluation>> {
        Ok(evaluations::find_by_id(&self.pool, id).await?)
    }

    async fn list_evaluations(
        &self,
        filter: &EvaluationFilter,
        page: &PaginationQuery,
    ) -> RepoResult<(Vec<Evaluation>, u64)> {
        Ok(evaluations::list(&self.pool, filter, page).await?)
    }

    async fn list_employee_evaluations(
        &self,
        employee_id: i64,
        statuses: &[EvaluationStatus],
    ) -> RepoResult<Vec<Evaluation>> {
        Ok(evaluations::list_for_employee(&self.pool, employee_id, statuses).await?)
    }

    async fn count_evaluations(
        &self,
        employee_id: i64,
        status: EvaluationStatus,
    ) -> RepoResult<u64> {
        Ok(evaluations::count_for_employee(&self.pool, employee_id, status).await?)
    }

    async fn update_evaluation(&self, id: i64, patch: &EvaluationPatch) -> RepoResult<Evaluation> {
        evaluations::update(&self.pool, id, patch).await
    }

    async fn delete_evaluation(&self, id: i64) -> RepoResult<()> {
        evaluations::delete_cascade(&self.pool, id).await
    }

    async fn find_score(&self, id: i64) -> RepoResult<Option<Score>> {
        Ok(scores::find_by_id(&self.pool, id).await?)
    }

    async fn list_scores(&self, evaluation_id: i64) -> RepoResult<Vec<Score>> {
        Ok(scores::list_for_evaluation(&self.pool, evaluation_id).await?)
    }

    async fn update_score(
        &self,
        id: i64,
        field: ScoreField,
        update: &ScoreUpdate,
    ) -> RepoResult<Score> {
        scores::update(&self.pool, id, field, update)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Score {id}")))
    }

    async fn create_invitations(
        &self,
        evaluation_id: i64,
        inviter_id: i64,
        invitee_ids: &[i64],
        message: &str,
        item_ids: &[i64],
    ) -> RepoResult<Vec<Invitation>> {
        invitations::create_batch(
            &self.pool,
            evaluation_id,
            inviter_id,
            invitee_ids,
            message,
            item_ids,
        )
        .await
    }

    async fn find_invitation(&self, id: i64) -> RepoResult<Option<Invitation>> {
        Ok(invitations::find_by_id(&self.pool, id).await?)
    }

    async fn list_invitations(&self, evaluation_id: i64) -> RepoResult<Vec<Invitation>> {
        Ok(invitations::list_for_evaluation(&self.pool, evaluation_id).await?)
    }

    async fn list_invitee_invitations(
        &self,
        invitee_id: i64,
        filter: &InvitationFilter,
        page: &PaginationQuery,
    ) -> RepoResult<(Vec<Invitation>, u64)> {
        Ok(invitations::list_for_invitee(&self.pool, invitee_id, filter, page).await?)
    }

    async fn count_invitations(
        &self,
        invitee_id: i64,
        status: InvitationStatus,
    ) -> RepoResult<u64> {
        Ok(invitations::count_for_invitee(&self.pool, invitee_id, status).await?)
    }

    async fn transition_invitation(
        &self,
        id: i64,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> RepoResult<Option<Invitation>> {
        Ok(invitations::transition(&self.pool, id, from, to).await?)
    }

    async fn delete_invitation(&self, id: i64) -> RepoResult<()> {
        invitations::delete_cascade(&self.pool, id).await
    }

    async fn find_invited_score(&self, id: i64) -> RepoResult<Option<InvitedScore>> {
        Ok(invitations::find_score(&self.pool, id).await?)
    }

    async fn list_invited_scores(&self, invitation_id: i64) -> RepoResult<Vec<InvitedScore>> {
        Ok(invitations::list_scores(&self.pool, invitation_id).await?)
    }

    async fn update_invited_score(
        &self,
        id: i64,
        update: &InvitedScoreUpdate,
    ) -> RepoResult<InvitedScore> {
        invitations::update_score(&self.pool, id, update)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Invited score {id}")))
    }
}
