//! Evaluation workflow
//!
//! ```text
//! pending → self_evaluated → manager_evaluated → pending_confirm → completed
//! ```
//!
//! Status changes are requested by callers. The engine rewrites exactly one:
//! `self_evaluated` for an employee without a manager becomes
//! `manager_evaluated`, with self scores copied into the manager column.
//! The same copy runs when the last self score of such an evaluation is
//! filled in. Entering `completed` aggregates final scores and the total.

use std::sync::Arc;

use shared::PaginatedResponse;
use shared::PaginationQuery;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Employee, Evaluation, EvaluationCreate, EvaluationDetail, EvaluationFilter, EvaluationStatus,
    EvaluationUpdate, Role, Score, ScoreField, ScoreUpdate,
};

use crate::auth::Identity;
use crate::db::{EvaluationPatch, EvaluationStore, ManagerFill, RepoError};
use crate::error::{ServiceError, ServiceResult};
use crate::notification::{EvaluationChange, NotificationEvent, Notifier};

/// Marker left in `manager_comment` when a manager score is copied from the self score
pub const AUTO_MANAGER_COMMENT: &str = "(self-evaluation score)";

/// Statuses in which an evaluation still waits on its employee or manager
const PENDING_STATUSES: [EvaluationStatus; 2] =
    [EvaluationStatus::Pending, EvaluationStatus::SelfEvaluated];

#[derive(Clone)]
pub struct EvaluationWorkflow {
    store: Arc<dyn EvaluationStore>,
    notifier: Notifier,
}

fn evaluation_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::EvaluationNotFound, format!("Evaluation {id} not found"))
        .with_detail("id", id)
}

fn employee_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::EmployeeNotFound, format!("Employee {id} not found"))
        .with_detail("id", id)
}

fn score_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::ScoreNotFound, format!("Score {id} not found"))
        .with_detail("id", id)
}

/// Copy every present self score into the manager column
fn manager_fill(scores: &[Score]) -> ManagerFill {
    ManagerFill {
        comment: AUTO_MANAGER_COMMENT.to_string(),
        scores: scores
            .iter()
            .filter_map(|s| s.self_score.map(|v| (s.id, v)))
            .collect(),
    }
}

/// Final score per row (HR > manager > self > 0) and their sum
fn aggregate(scores: &[Score]) -> (Vec<(i64, f64)>, f64) {
    let finals: Vec<(i64, f64)> = scores
        .iter()
        .map(|s| (s.id, s.authoritative_score()))
        .collect();
    let total: f64 = finals.iter().map(|(_, v)| v).sum();
    (finals, total)
}

impl EvaluationWorkflow {
    pub fn new(store: Arc<dyn EvaluationStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    async fn load(&self, id: i64) -> ServiceResult<Evaluation> {
        Ok(self
            .store
            .find_evaluation(id)
            .await?
            .ok_or_else(|| evaluation_not_found(id))?)
    }

    async fn load_employee(&self, id: i64) -> ServiceResult<Employee> {
        Ok(self
            .store
            .find_employee(id)
            .await?
            .ok_or_else(|| employee_not_found(id))?)
    }

    pub async fn create_evaluation(
        &self,
        identity: &Identity,
        data: EvaluationCreate,
    ) -> ServiceResult<EvaluationDetail> {
        identity.require_any(&[Role::Manager, Role::Hr])?;

        if data.month.is_some_and(|m| !(1..=12).contains(&m)) {
            return Err(AppError::validation("month must be between 1 and 12").into());
        }
        if data.quarter.is_some_and(|q| !(1..=4).contains(&q)) {
            return Err(AppError::validation("quarter must be between 1 and 4").into());
        }

        let employee = self.load_employee(data.employee_id).await?;
        let template = self.store.find_template(data.template_id).await?.ok_or_else(|| {
            AppError::with_message(
                ErrorCode::TemplateNotFound,
                format!("Template {} not found", data.template_id),
            )
        })?;
        let item_ids: Vec<i64> = self
            .store
            .list_template_items(template.id)
            .await?
            .into_iter()
            .map(|i| i.id)
            .collect();

        let evaluation = match self.store.create_evaluation(&data, &item_ids).await {
            Ok(evaluation) => evaluation,
            Err(RepoError::Duplicate(_)) => {
                return Err(AppError::with_message(
                    ErrorCode::EvaluationExists,
                    format!("evaluation for employee {} already exists", employee.name),
                )
                .with_detail("employee_id", employee.id)
                .into());
            }
            Err(e) => return Err(e.into()),
        };
        let scores = self.store.list_scores(evaluation.id).await?;

        tracing::info!(
            evaluation_id = evaluation.id,
            employee_id = employee.id,
            items = scores.len(),
            "Evaluation created"
        );

        self.notifier.send_notification(
            identity.user_id,
            NotificationEvent::Evaluation {
                change: EvaluationChange::Created,
                evaluation: evaluation.clone(),
            },
        );

        Ok(EvaluationDetail { evaluation, scores })
    }

    pub async fn get_evaluation(&self, id: i64) -> ServiceResult<EvaluationDetail> {
        let evaluation = self.load(id).await?;
        let scores = self.store.list_scores(id).await?;
        Ok(EvaluationDetail { evaluation, scores })
    }

    pub async fn list_evaluations(
        &self,
        filter: &EvaluationFilter,
        page: &PaginationQuery,
    ) -> ServiceResult<PaginatedResponse<Evaluation>> {
        let (items, total) = self.store.list_evaluations(filter, page).await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    pub async fn list_employee_evaluations(&self, employee_id: i64) -> ServiceResult<Vec<Evaluation>> {
        Ok(self.store.list_employee_evaluations(employee_id, &[]).await?)
    }

    /// Evaluations still waiting on the employee or their manager
    pub async fn list_pending_evaluations(&self, employee_id: i64) -> ServiceResult<Vec<Evaluation>> {
        Ok(self
            .store
            .list_employee_evaluations(employee_id, &PENDING_STATUSES)
            .await?)
    }

    /// Number of the caller's own evaluations awaiting self review
    pub async fn pending_count(&self, identity: &Identity) -> ServiceResult<u64> {
        Ok(self
            .store
            .count_evaluations(identity.user_id, EvaluationStatus::Pending)
            .await?)
    }

    pub async fn list_scores(&self, evaluation_id: i64) -> ServiceResult<Vec<Score>> {
        self.load(evaluation_id).await?;
        Ok(self.store.list_scores(evaluation_id).await?)
    }

    /// Merge `update` into an evaluation and run the status side effects
    pub async fn update_evaluation(
        &self,
        identity: &Identity,
        id: i64,
        update: EvaluationUpdate,
    ) -> ServiceResult<Evaluation> {
        let evaluation = self.load(id).await?;
        let subject = self.load_employee(evaluation.employee_id).await?;

        let involved = identity.user_id == subject.id
            || subject.manager_id == Some(identity.user_id)
            || identity.is_hr();
        if !involved {
            return Err(AppError::forbidden("Not allowed to update this evaluation").into());
        }

        let mut patch = EvaluationPatch {
            status: update.status,
            final_comment: update.final_comment,
            ..EvaluationPatch::default()
        };

        if patch.status == Some(EvaluationStatus::SelfEvaluated) && !subject.has_manager() {
            let scores = self.store.list_scores(id).await?;
            patch.status = Some(EvaluationStatus::ManagerEvaluated);
            patch.manager_fill = Some(manager_fill(&scores));
            tracing::info!(
                evaluation_id = id,
                employee_id = subject.id,
                "No manager, advancing to manager_evaluated"
            );
        }

        if patch.status == Some(EvaluationStatus::Completed) {
            let scores = self.store.list_scores(id).await?;
            let (finals, total) = aggregate(&scores);
            patch.final_scores = finals;
            patch.total_score = Some(total);
        }

        let updated = self.store.update_evaluation(id, &patch).await.map_err(|e| match e {
            RepoError::NotFound(_) => evaluation_not_found(id).into(),
            other => ServiceError::from(other),
        })?;

        if evaluation.status != updated.status {
            tracing::info!(
                evaluation_id = id,
                from = %evaluation.status,
                to = %updated.status,
                "Evaluation status changed"
            );
        }

        let change = if update.status.is_some() {
            EvaluationChange::StatusChanged
        } else {
            EvaluationChange::Updated
        };
        self.notifier.send_notification(
            identity.user_id,
            NotificationEvent::Evaluation {
                change,
                evaluation: updated.clone(),
            },
        );

        Ok(updated)
    }

    pub async fn delete_evaluation(&self, identity: &Identity, id: i64) -> ServiceResult<()> {
        identity.require_any(&[Role::Hr])?;
        let evaluation = self.load(id).await?;

        self.store.delete_evaluation(id).await?;
        tracing::info!(evaluation_id = id, "Evaluation deleted");

        self.notifier.send_notification(
            identity.user_id,
            NotificationEvent::Evaluation {
                change: EvaluationChange::Deleted,
                evaluation,
            },
        );
        Ok(())
    }

    /// Overwrite one score column. Values are stored as given.
    pub async fn update_score(
        &self,
        identity: &Identity,
        score_id: i64,
        field: ScoreField,
        update: ScoreUpdate,
    ) -> ServiceResult<Score> {
        let score = self
            .store
            .find_score(score_id)
            .await?
            .ok_or_else(|| score_not_found(score_id))?;
        let evaluation = self.load(score.evaluation_id).await?;
        let subject = self.load_employee(evaluation.employee_id).await?;

        let allowed = match field {
            ScoreField::SelfReview => identity.user_id == subject.id || identity.is_hr(),
            ScoreField::Manager => subject.manager_id == Some(identity.user_id) || identity.is_hr(),
            ScoreField::Hr | ScoreField::Final => identity.is_hr(),
        };
        if !allowed {
            return Err(AppError::forbidden(format!(
                "Not allowed to update the {} score",
                field.as_str()
            ))
            .into());
        }

        let mut updated = self.store.update_score(score_id, field, &update).await?;

        self.notifier.send_notification(
            identity.user_id,
            NotificationEvent::Score {
                field,
                score: updated.clone(),
            },
        );

        if field == ScoreField::SelfReview
            && self
                .propagate_without_manager(identity, &evaluation, &subject)
                .await?
            && let Some(refreshed) = self.store.find_score(score_id).await?
        {
            updated = refreshed;
        }

        Ok(updated)
    }

    /// Once every self score of a manager-less `self_evaluated` evaluation is
    /// filled, copy them to the manager column and advance the status.
    async fn propagate_without_manager(
        &self,
        identity: &Identity,
        evaluation: &Evaluation,
        subject: &Employee,
    ) -> ServiceResult<bool> {
        if evaluation.status != EvaluationStatus::SelfEvaluated || subject.has_manager() {
            return Ok(false);
        }

        let scores = self.store.list_scores(evaluation.id).await?;
        if scores.is_empty() || scores.iter().any(|s| s.self_score.is_none()) {
            return Ok(false);
        }

        let patch = EvaluationPatch {
            status: Some(EvaluationStatus::ManagerEvaluated),
            manager_fill: Some(manager_fill(&scores)),
            ..EvaluationPatch::default()
        };
        let updated = self.store.update_evaluation(evaluation.id, &patch).await?;

        tracing::info!(
            evaluation_id = evaluation.id,
            employee_id = subject.id,
            "Self scores complete without manager, advancing to manager_evaluated"
        );

        self.notifier.send_notification(
            identity.user_id,
            NotificationEvent::Evaluation {
                change: EvaluationChange::StatusChanged,
                evaluation: updated,
            },
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::live::{LiveConfig, LiveHub};
    use shared::models::{InvitationStatus, PeriodKind};

    struct Fixture {
        store: Arc<MemoryStore>,
        workflow: EvaluationWorkflow,
        hr: Identity,
        manager: Identity,
        template_id: i64,
    }

    fn identity(e: &Employee) -> Identity {
        Identity {
            user_id: e.id,
            role: e.role,
        }
    }

    fn fixture(items: &[f64]) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let hr = store.add_employee("Hana", Role::Hr, None);
        let manager = store.add_employee("Mina", Role::Manager, None);
        let (template, _) = store.add_template("Engineering", items);
        let live = LiveHub::new(LiveConfig::default());
        let notifier = Notifier::new(store.clone(), live);
        Fixture {
            workflow: EvaluationWorkflow::new(store.clone(), notifier),
            store,
            hr: identity(&hr),
            manager: identity(&manager),
            template_id: template.id,
        }
    }

    fn create(employee_id: i64, template_id: i64) -> EvaluationCreate {
        EvaluationCreate {
            employee_id,
            template_id,
            period: PeriodKind::Monthly,
            year: 2024,
            month: Some(3),
            quarter: None,
        }
    }

    async fn evaluation_for(f: &Fixture, employee: &Employee) -> EvaluationDetail {
        f.workflow
            .create_evaluation(&f.hr, create(employee.id, f.template_id))
            .await
            .unwrap()
    }

    fn status(s: EvaluationStatus) -> EvaluationUpdate {
        EvaluationUpdate {
            status: Some(s),
            final_comment: None,
        }
    }

    fn value(v: f64) -> ScoreUpdate {
        ScoreUpdate {
            score: Some(v),
            comment: String::new(),
        }
    }

    #[tokio::test]
    async fn self_evaluated_without_manager_short_circuits() {
        let f = fixture(&[10.0]);
        let solo = f.store.add_employee("Solo", Role::Employee, None);
        let detail = evaluation_for(&f, &solo).await;
        let score_id = detail.scores[0].id;
        f.store.edit_score(score_id, |s| s.self_score = Some(8.0));

        let updated = f
            .workflow
            .update_evaluation(
                &identity(&solo),
                detail.evaluation.id,
                status(EvaluationStatus::SelfEvaluated),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, EvaluationStatus::ManagerEvaluated);
        let score = f.store.find_score(score_id).await.unwrap().unwrap();
        assert_eq!(score.manager_score, Some(8.0));
        assert!(score.manager_auto);
        assert_eq!(score.manager_comment, AUTO_MANAGER_COMMENT);
    }

    #[tokio::test]
    async fn short_circuit_skips_missing_self_scores() {
        let f = fixture(&[10.0, 10.0]);
        let solo = f.store.add_employee("Solo", Role::Employee, None);
        let detail = evaluation_for(&f, &solo).await;
        f.store
            .edit_score(detail.scores[0].id, |s| s.self_score = Some(6.0));

        f.workflow
            .update_evaluation(&f.hr, detail.evaluation.id, status(EvaluationStatus::SelfEvaluated))
            .await
            .unwrap();

        let scores = f.store.list_scores(detail.evaluation.id).await.unwrap();
        assert_eq!(scores[0].manager_score, Some(6.0));
        assert_eq!(scores[1].manager_score, None);
        assert!(!scores[1].manager_auto);
    }

    #[tokio::test]
    async fn self_evaluated_with_manager_is_kept() {
        let f = fixture(&[10.0]);
        let emp = f
            .store
            .add_employee("Ivan", Role::Employee, Some(f.manager.user_id));
        let detail = evaluation_for(&f, &emp).await;
        f.store
            .edit_score(detail.scores[0].id, |s| s.self_score = Some(8.0));

        let updated = f
            .workflow
            .update_evaluation(
                &identity(&emp),
                detail.evaluation.id,
                status(EvaluationStatus::SelfEvaluated),
            )
            .await
            .unwrap();

        assert_eq!(updated.status, EvaluationStatus::SelfEvaluated);
        let score = f.store.find_score(detail.scores[0].id).await.unwrap().unwrap();
        assert_eq!(score.manager_score, None);
    }

    #[tokio::test]
    async fn completion_aggregates_manager_scores() {
        let f = fixture(&[10.0, 10.0]);
        let emp = f
            .store
            .add_employee("Ivan", Role::Employee, Some(f.manager.user_id));
        let detail = evaluation_for(&f, &emp).await;
        let ids: Vec<i64> = detail.scores.iter().map(|s| s.id).collect();
        f.store.edit_score(ids[0], |s| s.manager_score = Some(9.0));
        f.store.edit_score(ids[1], |s| s.manager_score = Some(7.0));

        let updated = f
            .workflow
            .update_evaluation(&f.hr, detail.evaluation.id, status(EvaluationStatus::Completed))
            .await
            .unwrap();

        assert_eq!(updated.status, EvaluationStatus::Completed);
        assert_eq!(updated.total_score, 16.0);
        let finals: Vec<Option<f64>> = f
            .store
            .list_scores(detail.evaluation.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.final_score)
            .collect();
        assert_eq!(finals, vec![Some(9.0), Some(7.0)]);

        // completing again with unchanged scores is idempotent
        let again = f
            .workflow
            .update_evaluation(&f.hr, detail.evaluation.id, status(EvaluationStatus::Completed))
            .await
            .unwrap();
        assert_eq!(again.total_score, 16.0);
    }

    #[tokio::test]
    async fn completion_prefers_hr_then_manager_then_self() {
        let f = fixture(&[10.0, 10.0, 10.0, 10.0]);
        let emp = f
            .store
            .add_employee("Ivan", Role::Employee, Some(f.manager.user_id));
        let detail = evaluation_for(&f, &emp).await;
        let ids: Vec<i64> = detail.scores.iter().map(|s| s.id).collect();
        f.store.edit_score(ids[0], |s| {
            s.self_score = Some(5.0);
            s.manager_score = Some(6.0);
            s.hr_score = Some(7.0);
        });
        f.store.edit_score(ids[1], |s| {
            s.self_score = Some(5.0);
            s.manager_score = Some(6.0);
        });
        f.store.edit_score(ids[2], |s| s.self_score = Some(5.0));

        let updated = f
            .workflow
            .update_evaluation(&f.hr, detail.evaluation.id, status(EvaluationStatus::Completed))
            .await
            .unwrap();

        let finals: Vec<Option<f64>> = f
            .store
            .list_scores(detail.evaluation.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.final_score)
            .collect();
        assert_eq!(finals, vec![Some(7.0), Some(6.0), Some(5.0), Some(0.0)]);
        assert_eq!(updated.total_score, 18.0);
    }

    #[tokio::test]
    async fn lower_authority_edit_after_completion_keeps_final_score() {
        let f = fixture(&[10.0]);
        let emp = f
            .store
            .add_employee("Ivan", Role::Employee, Some(f.manager.user_id));
        let detail = evaluation_for(&f, &emp).await;
        let id = detail.scores[0].id;
        f.store.edit_score(id, |s| s.manager_score = Some(9.0));
        f.workflow
            .update_evaluation(&f.hr, detail.evaluation.id, status(EvaluationStatus::Completed))
            .await
            .unwrap();

        f.workflow
            .update_score(&identity(&emp), id, ScoreField::SelfReview, value(3.0))
            .await
            .unwrap();

        let score = f.store.find_score(id).await.unwrap().unwrap();
        assert_eq!(score.final_score, Some(9.0));
        let evaluation = f.store.find_evaluation(detail.evaluation.id).await.unwrap().unwrap();
        assert_eq!(evaluation.total_score, 9.0);
    }

    #[tokio::test]
    async fn last_self_score_propagates_without_manager() {
        let f = fixture(&[10.0, 10.0]);
        let solo = f.store.add_employee("Solo", Role::Employee, None);
        let me = identity(&solo);
        let detail = evaluation_for(&f, &solo).await;
        let ids: Vec<i64> = detail.scores.iter().map(|s| s.id).collect();
        f.store
            .set_status(detail.evaluation.id, EvaluationStatus::SelfEvaluated);

        f.workflow
            .update_score(&me, ids[0], ScoreField::SelfReview, value(8.0))
            .await
            .unwrap();
        let evaluation = f.store.find_evaluation(detail.evaluation.id).await.unwrap().unwrap();
        assert_eq!(evaluation.status, EvaluationStatus::SelfEvaluated);
        assert_eq!(f.store.find_score(ids[0]).await.unwrap().unwrap().manager_score, None);

        let last = f
            .workflow
            .update_score(&me, ids[1], ScoreField::SelfReview, value(6.0))
            .await
            .unwrap();
        assert_eq!(last.manager_score, Some(6.0));
        assert!(last.manager_auto);

        let evaluation = f.store.find_evaluation(detail.evaluation.id).await.unwrap().unwrap();
        assert_eq!(evaluation.status, EvaluationStatus::ManagerEvaluated);
        let first = f.store.find_score(ids[0]).await.unwrap().unwrap();
        assert_eq!(first.manager_score, Some(8.0));
        assert_eq!(first.manager_comment, AUTO_MANAGER_COMMENT);
    }

    #[tokio::test]
    async fn self_score_in_pending_does_not_propagate() {
        let f = fixture(&[10.0]);
        let solo = f.store.add_employee("Solo", Role::Employee, None);
        let detail = evaluation_for(&f, &solo).await;

        let score = f
            .workflow
            .update_score(&identity(&solo), detail.scores[0].id, ScoreField::SelfReview, value(8.0))
            .await
            .unwrap();
        assert_eq!(score.manager_score, None);
        let evaluation = f.store.find_evaluation(detail.evaluation.id).await.unwrap().unwrap();
        assert_eq!(evaluation.status, EvaluationStatus::Pending);
    }

    #[tokio::test]
    async fn score_updates_are_role_gated() {
        let f = fixture(&[10.0]);
        let emp = f
            .store
            .add_employee("Ivan", Role::Employee, Some(f.manager.user_id));
        let other = f.store.add_employee("Jun", Role::Employee, None);
        let detail = evaluation_for(&f, &emp).await;
        let id = detail.scores[0].id;
        let wf = &f.workflow;

        let denied = |r: ServiceResult<Score>| {
            let err: AppError = r.unwrap_err().into();
            assert_eq!(err.code, ErrorCode::PermissionDenied);
        };

        denied(wf.update_score(&identity(&other), id, ScoreField::SelfReview, value(1.0)).await);
        denied(wf.update_score(&identity(&emp), id, ScoreField::Manager, value(1.0)).await);
        denied(wf.update_score(&f.manager, id, ScoreField::Hr, value(1.0)).await);
        denied(wf.update_score(&identity(&emp), id, ScoreField::Final, value(1.0)).await);

        wf.update_score(&identity(&emp), id, ScoreField::SelfReview, value(7.0))
            .await
            .unwrap();
        let manual = wf
            .update_score(&f.manager, id, ScoreField::Manager, value(8.0))
            .await
            .unwrap();
        assert!(!manual.manager_auto);
        wf.update_score(&f.hr, id, ScoreField::Hr, value(9.0))
            .await
            .unwrap();
        let fin = wf
            .update_score(&f.hr, id, ScoreField::Final, value(9.5))
            .await
            .unwrap();
        assert_eq!(fin.self_score, Some(7.0));
        assert_eq!(fin.manager_score, Some(8.0));
        assert_eq!(fin.hr_score, Some(9.0));
        assert_eq!(fin.final_score, Some(9.5));
    }

    #[tokio::test]
    async fn score_above_item_max_is_stored_verbatim() {
        let f = fixture(&[10.0]);
        let emp = f
            .store
            .add_employee("Ivan", Role::Employee, Some(f.manager.user_id));
        let detail = evaluation_for(&f, &emp).await;

        let score = f
            .workflow
            .update_score(&identity(&emp), detail.scores[0].id, ScoreField::SelfReview, value(150.0))
            .await
            .unwrap();
        assert_eq!(score.self_score, Some(150.0));
    }

    #[tokio::test]
    async fn duplicate_evaluation_is_rejected() {
        let f = fixture(&[10.0]);
        let emp = f.store.add_employee("Ivan", Role::Employee, None);
        evaluation_for(&f, &emp).await;

        let err: AppError = f
            .workflow
            .create_evaluation(&f.hr, create(emp.id, f.template_id))
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::EvaluationExists);
        assert_eq!(err.message, "evaluation for employee Ivan already exists");

        // another month is a different period
        let mut april = create(emp.id, f.template_id);
        april.month = Some(4);
        f.workflow.create_evaluation(&f.hr, april).await.unwrap();
    }

    #[tokio::test]
    async fn create_seeds_one_score_per_item_and_requires_role() {
        let f = fixture(&[10.0, 20.0, 5.0]);
        let emp = f.store.add_employee("Ivan", Role::Employee, None);

        let err: AppError = f
            .workflow
            .create_evaluation(&identity(&emp), create(emp.id, f.template_id))
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::RoleRequired);

        let detail = f
            .workflow
            .create_evaluation(&f.manager, create(emp.id, f.template_id))
            .await
            .unwrap();
        assert_eq!(detail.evaluation.status, EvaluationStatus::Pending);
        assert_eq!(detail.evaluation.total_score, 0.0);
        assert_eq!(detail.scores.len(), 3);

        let err: AppError = f
            .workflow
            .create_evaluation(&f.hr, create(emp.id, 9999))
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::TemplateNotFound);
    }

    #[tokio::test]
    async fn unknown_evaluation_is_not_found() {
        let f = fixture(&[10.0]);
        let err: AppError = f
            .workflow
            .update_evaluation(&f.hr, 404, status(EvaluationStatus::Completed))
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::EvaluationNotFound);
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_internal_and_leaves_state() {
        let f = fixture(&[10.0]);
        let emp = f.store.add_employee("Ivan", Role::Employee, None);
        let detail = evaluation_for(&f, &emp).await;
        f.store.fail_writes(true);

        let err: AppError = f
            .workflow
            .update_evaluation(&f.hr, detail.evaluation.id, status(EvaluationStatus::Completed))
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::InternalError);

        let evaluation = f.store.find_evaluation(detail.evaluation.id).await.unwrap().unwrap();
        assert_eq!(evaluation.status, EvaluationStatus::Pending);
    }

    #[tokio::test]
    async fn unrelated_employee_cannot_update_evaluation() {
        let f = fixture(&[10.0]);
        let emp = f
            .store
            .add_employee("Ivan", Role::Employee, Some(f.manager.user_id));
        let other = f.store.add_employee("Jun", Role::Employee, None);
        let detail = evaluation_for(&f, &emp).await;

        let err: AppError = f
            .workflow
            .update_evaluation(
                &identity(&other),
                detail.evaluation.id,
                status(EvaluationStatus::SelfEvaluated),
            )
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let updated = f
            .workflow
            .update_evaluation(
                &f.manager,
                detail.evaluation.id,
                EvaluationUpdate {
                    status: None,
                    final_comment: Some("solid quarter".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.final_comment, "solid quarter");
        assert_eq!(updated.status, EvaluationStatus::Pending);
    }

    #[tokio::test]
    async fn delete_cascades_and_requires_hr() {
        let f = fixture(&[10.0, 10.0]);
        let emp = f.store.add_employee("Ivan", Role::Employee, None);
        let peer = f.store.add_employee("Jun", Role::Employee, None);
        let detail = evaluation_for(&f, &emp).await;
        let id = detail.evaluation.id;
        let item_ids: Vec<i64> = detail.scores.iter().map(|s| s.item_id).collect();
        let invitation = f
            .store
            .create_invitations(id, f.hr.user_id, &[peer.id], "", &item_ids)
            .await
            .unwrap()
            .remove(0);
        f.store
            .set_invitation_status(invitation.id, InvitationStatus::Accepted);

        let err: AppError = f
            .workflow
            .delete_evaluation(&f.manager, id)
            .await
            .unwrap_err()
            .into();
        assert_eq!(err.code, ErrorCode::RoleRequired);

        f.workflow.delete_evaluation(&f.hr, id).await.unwrap();
        assert!(f.store.find_evaluation(id).await.unwrap().is_none());
        assert_eq!(f.store.score_count(), 0);
        assert_eq!(f.store.invitation_count(), 0);
        assert_eq!(f.store.invited_score_count(), 0);
    }

    #[tokio::test]
    async fn pending_lists_and_counts() {
        let f = fixture(&[10.0]);
        let emp = f.store.add_employee("Ivan", Role::Employee, None);
        let mut ids = Vec::new();
        for month in 1..=3 {
            let mut data = create(emp.id, f.template_id);
            data.month = Some(month);
            ids.push(
                f.workflow
                    .create_evaluation(&f.hr, data)
                    .await
                    .unwrap()
                    .evaluation
                    .id,
            );
        }
        f.store.set_status(ids[1], EvaluationStatus::SelfEvaluated);
        f.store.set_status(ids[2], EvaluationStatus::Completed);

        let pending = f.workflow.list_pending_evaluations(emp.id).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(f.workflow.pending_count(&identity(&emp)).await.unwrap(), 1);
        assert_eq!(
            f.workflow.list_employee_evaluations(emp.id).await.unwrap().len(),
            3
        );

        let page = f
            .workflow
            .list_evaluations(
                &EvaluationFilter {
                    status: Some(EvaluationStatus::Completed),
                    ..EvaluationFilter::default()
                },
                &PaginationQuery::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, ids[2]);
    }
}
