//! Peer invitations
//!
//! HR invites colleagues to score an evaluation once it reaches
//! `manager_evaluated`. Each invitee scores every template item, then marks
//! the invitation completed.
//!
//! Who may do what:
//! - hr: create, cancel, reinvite, delete, list per evaluation
//! - invitee: accept, decline, score, complete
//! - invitee or hr: read details and scores

use std::collections::HashSet;
use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::models::{
    EvaluationStatus, Invitation, InvitationCreate, InvitationDetail, InvitationFilter,
    InvitationStatus, InvitedScore, InvitedScoreUpdate, Role,
};
use shared::{PaginatedResponse, PaginationQuery};

use crate::auth::Identity;
use crate::db::EvaluationStore;
use crate::error::ServiceResult;
use crate::notification::{InvitationChange, NotificationEvent, Notifier};

#[derive(Clone)]
pub struct InvitationService {
    store: Arc<dyn EvaluationStore>,
    notifier: Notifier,
}

fn invitation_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::InvitationNotFound, format!("Invitation {id} not found"))
        .with_detail("id", id)
}

fn invalid_transition(invitation: &Invitation, to: InvitationStatus) -> AppError {
    AppError::with_message(
        ErrorCode::InvitationInvalidStatus,
        format!(
            "Invitation cannot move from {} to {}",
            invitation.status, to
        ),
    )
    .with_detail("id", invitation.id)
    .with_detail("status", invitation.status.as_str())
}

fn require_invitee(identity: &Identity, invitation: &Invitation) -> Result<(), AppError> {
    if identity.user_id != invitation.invitee_id {
        return Err(AppError::forbidden("Only the invitee may do this"));
    }
    Ok(())
}

fn require_invitee_or_hr(identity: &Identity, invitation: &Invitation) -> Result<(), AppError> {
    if identity.user_id != invitation.invitee_id && !identity.is_hr() {
        return Err(AppError::forbidden("Not allowed to view this invitation"));
    }
    Ok(())
}

impl InvitationService {
    pub fn new(store: Arc<dyn EvaluationStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    async fn load(&self, id: i64) -> ServiceResult<Invitation> {
        Ok(self
            .store
            .find_invitation(id)
            .await?
            .ok_or_else(|| invitation_not_found(id))?)
    }

    /// Invite every listed employee not already invited to the evaluation
    ///
    /// Returns the invitations created by this call; ids that were already
    /// invited (or repeated in the request) are skipped.
    pub async fn create(
        &self,
        identity: &Identity,
        evaluation_id: i64,
        data: InvitationCreate,
    ) -> ServiceResult<Vec<Invitation>> {
        identity.require_any(&[Role::Hr])?;

        let evaluation = self
            .store
            .find_evaluation(evaluation_id)
            .await?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::EvaluationNotFound,
                    format!("Evaluation {evaluation_id} not found"),
                )
            })?;
        if evaluation.status != EvaluationStatus::ManagerEvaluated {
            return Err(AppError::with_message(
                ErrorCode::EvaluationInvalidStatus,
                "Invitations require an evaluation in manager_evaluated status",
            )
            .with_detail("status", evaluation.status.as_str())
            .into());
        }
        // an empty batch is rejected by the store
        let mut seen = HashSet::new();
        let invitee_ids: Vec<i64> = data
            .invitee_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();
        for &id in &invitee_ids {
            if self.store.find_employee(id).await?.is_none() {
                return Err(AppError::with_message(
                    ErrorCode::EmployeeNotFound,
                    format!("Employee {id} not found"),
                )
                .with_detail("id", id)
                .into());
            }
        }

        let item_ids: Vec<i64> = self
            .store
            .list_template_items(evaluation.template_id)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();

        let created = self
            .store
            .create_invitations(
                evaluation_id,
                identity.user_id,
                &invitee_ids,
                &data.message,
                &item_ids,
            )
            .await?;

        tracing::info!(
            evaluation_id,
            requested = invitee_ids.len(),
            created = created.len(),
            "Invitations created"
        );

        for invitation in &created {
            self.notifier.send_notification(
                identity.user_id,
                NotificationEvent::Invitation {
                    change: InvitationChange::Created,
                    invitation: invitation.clone(),
                },
            );
        }
        Ok(created)
    }

    async fn transition(
        &self,
        identity: &Identity,
        invitation: Invitation,
        to: InvitationStatus,
    ) -> ServiceResult<Invitation> {
        if !invitation.status.can_transition_to(to) {
            return Err(invalid_transition(&invitation, to).into());
        }

        let updated = self
            .store
            .transition_invitation(invitation.id, invitation.status, to)
            .await?
            // status changed underneath us
            .ok_or_else(|| invalid_transition(&invitation, to))?;

        tracing::info!(
            invitation_id = updated.id,
            from = %invitation.status,
            to = %updated.status,
            "Invitation status changed"
        );

        self.notifier.send_notification(
            identity.user_id,
            NotificationEvent::Invitation {
                change: InvitationChange::StatusChanged,
                invitation: updated.clone(),
            },
        );
        Ok(updated)
    }

    pub async fn accept(&self, identity: &Identity, id: i64) -> ServiceResult<Invitation> {
        let invitation = self.load(id).await?;
        require_invitee(identity, &invitation)?;
        self.transition(identity, invitation, InvitationStatus::Accepted)
            .await
    }

    pub async fn decline(&self, identity: &Identity, id: i64) -> ServiceResult<Invitation> {
        let invitation = self.load(id).await?;
        require_invitee(identity, &invitation)?;
        self.transition(identity, invitation, InvitationStatus::Declined)
            .await
    }

    /// Finish an accepted invitation; every item must carry a score
    pub async fn complete(&self, identity: &Identity, id: i64) -> ServiceResult<Invitation> {
        let invitation = self.load(id).await?;
        require_invitee(identity, &invitation)?;
        if invitation.status != InvitationStatus::Accepted {
            return Err(invalid_transition(&invitation, InvitationStatus::Completed).into());
        }

        let scores = self.store.list_invited_scores(id).await?;
        let scored = scores.iter().filter(|s| s.score.is_some()).count();
        if scored != scores.len() {
            return Err(AppError::with_message(
                ErrorCode::InvitationIncomplete,
                "Every item must be scored before completing the invitation",
            )
            .with_detail("scored", scored)
            .with_detail("total", scores.len())
            .into());
        }

        self.transition(identity, invitation, InvitationStatus::Completed)
            .await
    }

    pub async fn cancel(&self, identity: &Identity, id: i64) -> ServiceResult<Invitation> {
        identity.require_any(&[Role::Hr])?;
        let invitation = self.load(id).await?;
        self.transition(identity, invitation, InvitationStatus::Cancelled)
            .await
    }

    /// Send a declined invitation again
    pub async fn reinvite(&self, identity: &Identity, id: i64) -> ServiceResult<Invitation> {
        identity.require_any(&[Role::Hr])?;
        let invitation = self.load(id).await?;
        self.transition(identity, invitation, InvitationStatus::Pending)
            .await
    }

    pub async fn delete(&self, identity: &Identity, id: i64) -> ServiceResult<()> {
        identity.require_any(&[Role::Hr])?;
        let invitation = self.load(id).await?;

        self.store.delete_invitation(id).await?;
        tracing::info!(invitation_id = id, "Invitation deleted");

        self.notifier.send_notification(
            identity.user_id,
            NotificationEvent::Invitation {
                change: InvitationChange::Deleted,
                invitation,
            },
        );
        Ok(())
    }

    /// Invitee scores one item while the invitation is accepted
    pub async fn update_invited_score(
        &self,
        identity: &Identity,
        score_id: i64,
        update: InvitedScoreUpdate,
    ) -> ServiceResult<InvitedScore> {
        let score = self
            .store
            .find_invited_score(score_id)
            .await?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::InvitedScoreNotFound,
                    format!("Invited score {score_id} not found"),
                )
            })?;
        let invitation = self.load(score.invitation_id).await?;
        require_invitee(identity, &invitation)?;
        if invitation.status != InvitationStatus::Accepted {
            return Err(AppError::with_message(
                ErrorCode::InvitationInvalidStatus,
                "Scores can only be changed on an accepted invitation",
            )
            .with_detail("status", invitation.status.as_str())
            .into());
        }

        let updated = self.store.update_invited_score(score_id, &update).await?;

        self.notifier.send_notification(
            identity.user_id,
            NotificationEvent::InvitedScore {
                score: updated.clone(),
            },
        );
        Ok(updated)
    }

    pub async fn list_for_evaluation(
        &self,
        identity: &Identity,
        evaluation_id: i64,
    ) -> ServiceResult<Vec<Invitation>> {
        identity.require_any(&[Role::Hr])?;
        Ok(self.store.list_invitations(evaluation_id).await?)
    }

    pub async fn list_mine(
        &self,
        identity: &Identity,
        filter: &InvitationFilter,
        page: &PaginationQuery,
    ) -> ServiceResult<PaginatedResponse<Invitation>> {
        let (items, total) = self
            .store
            .list_invitee_invitations(identity.user_id, filter, page)
            .await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    pub async fn get_details(&self, identity: &Identity, id: i64) -> ServiceResult<InvitationDetail> {
        let invitation = self.load(id).await?;
        require_invitee_or_hr(identity, &invitation)?;
        let scores = self.store.list_invited_scores(id).await?;
        Ok(InvitationDetail { invitation, scores })
    }

    pub async fn list_scores(&self, identity: &Identity, id: i64) -> ServiceResult<Vec<InvitedScore>> {
        let invitation = self.load(id).await?;
        require_invitee_or_hr(identity, &invitation)?;
        Ok(self.store.list_invited_scores(id).await?)
    }

    /// Invitations waiting on the caller's answer
    pub async fn pending_count(&self, identity: &Identity) -> ServiceResult<u64> {
        Ok(self
            .store
            .count_invitations(identity.user_id, InvitationStatus::Pending)
            .await?)
    }
}
