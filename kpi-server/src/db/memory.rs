//! In-memory [`EvaluationStore`] for service tests

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use shared::PaginationQuery;
use shared::models::{
    Employee, Evaluation, EvaluationCreate, EvaluationFilter, EvaluationStatus, Invitation,
    InvitationFilter, InvitationStatus, InvitedScore, InvitedScoreUpdate, KpiItem, KpiTemplate,
    PeriodKind, Role, Score, ScoreField, ScoreUpdate,
};
use shared::util::now_millis;

use super::{EvaluationPatch, EvaluationStore, RepoError, RepoResult};

#[derive(Default)]
struct Tables {
    next_id: i64,
    employees: BTreeMap<i64, Employee>,
    templates: BTreeMap<i64, KpiTemplate>,
    items: BTreeMap<i64, KpiItem>,
    evaluations: BTreeMap<i64, Evaluation>,
    scores: BTreeMap<i64, Score>,
    invitations: BTreeMap<i64, Invitation>,
    invited_scores: BTreeMap<i64, InvitedScore>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a database error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_write(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Database("connection reset by peer".into()));
        }
        Ok(())
    }

    pub fn add_employee(&self, name: &str, role: Role, manager_id: Option<i64>) -> Employee {
        let mut t = self.tables.lock().unwrap();
        let id = t.id();
        let employee = Employee {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            position: String::new(),
            department_id: None,
            manager_id,
            role,
            is_active: true,
            created_at: now_millis(),
        };
        t.employees.insert(id, employee.clone());
        employee
    }

    pub fn set_department(&self, employee_id: i64, department_id: i64) {
        let mut t = self.tables.lock().unwrap();
        if let Some(e) = t.employees.get_mut(&employee_id) {
            e.department_id = Some(department_id);
        }
    }

    /// Template with one item per entry of `max_scores`
    pub fn add_template(&self, name: &str, max_scores: &[f64]) -> (KpiTemplate, Vec<KpiItem>) {
        let mut t = self.tables.lock().unwrap();
        let template = KpiTemplate {
            id: t.id(),
            name: name.to_string(),
            description: String::new(),
            period: PeriodKind::Monthly,
            is_active: true,
        };
        t.templates.insert(template.id, template.clone());

        let mut items = Vec::new();
        for (i, max) in max_scores.iter().enumerate() {
            let item = KpiItem {
                id: t.id(),
                template_id: template.id,
                name: format!("Item {}", i + 1),
                description: String::new(),
                max_score: *max,
                sort_order: i as i32,
            };
            t.items.insert(item.id, item.clone());
            items.push(item);
        }
        (template, items)
    }

    /// Mutate a score row directly, bypassing role checks
    pub fn edit_score(&self, id: i64, f: impl FnOnce(&mut Score)) {
        let mut t = self.tables.lock().unwrap();
        if let Some(s) = t.scores.get_mut(&id) {
            f(s);
        }
    }

    pub fn set_status(&self, evaluation_id: i64, status: EvaluationStatus) {
        let mut t = self.tables.lock().unwrap();
        if let Some(e) = t.evaluations.get_mut(&evaluation_id) {
            e.status = status;
        }
    }

    pub fn set_invitation_status(&self, invitation_id: i64, status: InvitationStatus) {
        let mut t = self.tables.lock().unwrap();
        if let Some(i) = t.invitations.get_mut(&invitation_id) {
            i.status = status;
        }
    }

    pub fn invitation_count(&self) -> usize {
        self.tables.lock().unwrap().invitations.len()
    }

    pub fn invited_score_count(&self) -> usize {
        self.tables.lock().unwrap().invited_scores.len()
    }

    pub fn score_count(&self) -> usize {
        self.tables.lock().unwrap().scores.len()
    }
}

fn paginate<T>(rows: Vec<T>, page: &PaginationQuery) -> (Vec<T>, u64) {
    let total = rows.len() as u64;
    let rows = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    (rows, total)
}

#[async_trait]
impl EvaluationStore for MemoryStore {
    async fn find_employee(&self, id: i64) -> RepoResult<Option<Employee>> {
        Ok(self.tables.lock().unwrap().employees.get(&id).cloned())
    }

    async fn list_employee_ids_by_role(&self, role: Role) -> RepoResult<Vec<i64>> {
        let t = self.tables.lock().unwrap();
        Ok(t.employees
            .values()
            .filter(|e| e.role == role && e.is_active)
            .map(|e| e.id)
            .collect())
    }

    async fn find_template(&self, id: i64) -> RepoResult<Option<KpiTemplate>> {
        Ok(self.tables.lock().unwrap().templates.get(&id).cloned())
    }

    async fn list_template_items(&self, template_id: i64) -> RepoResult<Vec<KpiItem>> {
        let t = self.tables.lock().unwrap();
        Ok(t.items
            .values()
            .filter(|i| i.template_id == template_id)
            .cloned()
            .collect())
    }

    async fn create_evaluation(
        &self,
        data: &EvaluationCreate,
        item_ids: &[i64],
    ) -> RepoResult<Evaluation> {
        self.check_write()?;
        let mut t = self.tables.lock().unwrap();
        if let Some(existing) = t.evaluations.values().find(|e| {
            e.employee_id == data.employee_id
                && e.template_id == data.template_id
                && e.period == data.period
                && e.year == data.year
                && e.month == data.month
                && e.quarter == data.quarter
        }) {
            return Err(RepoError::Duplicate(format!("Evaluation {}", existing.id)));
        }

        let now = now_millis();
        let evaluation = Evaluation {
            id: t.id(),
            employee_id: data.employee_id,
            template_id: data.template_id,
            period: data.period,
            year: data.year,
            month: data.month,
            quarter: data.quarter,
            status: EvaluationStatus::Pending,
            total_score: 0.0,
            final_comment: String::new(),
            created_at: now,
            updated_at: now,
        };
        t.evaluations.insert(evaluation.id, evaluation.clone());

        for &item_id in item_ids {
            let id = t.id();
            t.scores.insert(
                id,
                Score {
                    id,
                    evaluation_id: evaluation.id,
                    item_id,
                    self_score: None,
                    self_comment: String::new(),
                    manager_score: None,
                    manager_comment: String::new(),
                    manager_auto: false,
                    hr_score: None,
                    hr_comment: String::new(),
                    final_score: None,
                    final_comment: String::new(),
                    updated_at: now,
                },
            );
        }
        Ok(evaluation)
    }

    async fn find_evaluation(&self, id: i64) -> RepoResult<Option<Evaluation>> {
        Ok(self.tables.lock().unwrap().evaluations.get(&id).cloned())
    }

    async fn list_evaluations(
        &self,
        filter: &EvaluationFilter,
        page: &PaginationQuery,
    ) -> RepoResult<(Vec<Evaluation>, u64)> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<Evaluation> = t
            .evaluations
            .values()
            .filter(|e| filter.status.is_none_or(|s| e.status == s))
            .filter(|e| filter.employee_id.is_none_or(|id| e.employee_id == id))
            .filter(|e| {
                filter.department_id.is_none_or(|dept| {
                    t.employees
                        .get(&e.employee_id)
                        .is_some_and(|emp| emp.department_id == Some(dept))
                })
            })
            .filter(|e| filter.period.is_none_or(|p| e.period == p))
            .filter(|e| filter.year.is_none_or(|y| e.year == y))
            .filter(|e| filter.month.is_none_or(|m| e.month == Some(m)))
            .filter(|e| filter.quarter.is_none_or(|q| e.quarter == Some(q)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(rows, page))
    }

    async fn list_employee_evaluations(
        &self,
        employee_id: i64,
        statuses: &[EvaluationStatus],
    ) -> RepoResult<Vec<Evaluation>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<Evaluation> = t
            .evaluations
            .values()
            .filter(|e| e.employee_id == employee_id)
            .filter(|e| statuses.is_empty() || statuses.contains(&e.status))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn count_evaluations(
        &self,
        employee_id: i64,
        status: EvaluationStatus,
    ) -> RepoResult<u64> {
        let t = self.tables.lock().unwrap();
        Ok(t.evaluations
            .values()
            .filter(|e| e.employee_id == employee_id && e.status == status)
            .count() as u64)
    }

    async fn update_evaluation(&self, id: i64, patch: &EvaluationPatch) -> RepoResult<Evaluation> {
        self.check_write()?;
        let mut t = self.tables.lock().unwrap();
        if !t.evaluations.contains_key(&id) {
            return Err(RepoError::NotFound(format!("Evaluation {id}")));
        }
        let now = now_millis();

        if let Some(fill) = &patch.manager_fill {
            for (score_id, value) in &fill.scores {
                if let Some(s) = t.scores.get_mut(score_id).filter(|s| s.evaluation_id == id) {
                    s.manager_score = Some(*value);
                    s.manager_comment = fill.comment.clone();
                    s.manager_auto = true;
                    s.updated_at = now;
                }
            }
        }
        for (score_id, value) in &patch.final_scores {
            if let Some(s) = t.scores.get_mut(score_id).filter(|s| s.evaluation_id == id) {
                s.final_score = Some(*value);
                s.updated_at = now;
            }
        }

        let Some(evaluation) = t.evaluations.get_mut(&id) else {
            return Err(RepoError::NotFound(format!("Evaluation {id}")));
        };
        if let Some(status) = patch.status {
            evaluation.status = status;
        }
        if let Some(comment) = &patch.final_comment {
            evaluation.final_comment = comment.clone();
        }
        if let Some(total) = patch.total_score {
            evaluation.total_score = total;
        }
        evaluation.updated_at = now;
        Ok(evaluation.clone())
    }

    async fn delete_evaluation(&self, id: i64) -> RepoResult<()> {
        self.check_write()?;
        let mut t = self.tables.lock().unwrap();
        if t.evaluations.remove(&id).is_none() {
            return Err(RepoError::NotFound(format!("Evaluation {id}")));
        }
        let invitation_ids: Vec<i64> = t
            .invitations
            .values()
            .filter(|i| i.evaluation_id == id)
            .map(|i| i.id)
            .collect();
        t.invited_scores
            .retain(|_, s| !invitation_ids.contains(&s.invitation_id));
        t.invitations.retain(|_, i| i.evaluation_id != id);
        t.scores.retain(|_, s| s.evaluation_id != id);
        Ok(())
    }

    async fn find_score(&self, id: i64) -> RepoResult<Option<Score>> {
        Ok(self.tables.lock().unwrap().scores.get(&id).cloned())
    }

    async fn list_scores(&self, evaluation_id: i64) -> RepoResult<Vec<Score>> {
        let t = self.tables.lock().unwrap();
        Ok(t.scores
            .values()
            .filter(|s| s.evaluation_id == evaluation_id)
            .cloned()
            .collect())
    }

    async fn update_score(
        &self,
        id: i64,
        field: ScoreField,
        update: &ScoreUpdate,
    ) -> RepoResult<Score> {
        self.check_write()?;
        let mut t = self.tables.lock().unwrap();
        let Some(s) = t.scores.get_mut(&id) else {
            return Err(RepoError::NotFound(format!("Score {id}")));
        };
        match field {
            ScoreField::SelfReview => {
                s.self_score = update.score;
                s.self_comment = update.comment.clone();
            }
            ScoreField::Manager => {
                s.manager_score = update.score;
                s.manager_comment = update.comment.clone();
                s.manager_auto = false;
            }
            ScoreField::Hr => {
                s.hr_score = update.score;
                s.hr_comment = update.comment.clone();
            }
            ScoreField::Final => {
                s.final_score = update.score;
                s.final_comment = update.comment.clone();
            }
        }
        s.updated_at = now_millis();
        Ok(s.clone())
    }

    async fn create_invitations(
        &self,
        evaluation_id: i64,
        inviter_id: i64,
        invitee_ids: &[i64],
        message: &str,
        item_ids: &[i64],
    ) -> RepoResult<Vec<Invitation>> {
        if invitee_ids.is_empty() {
            return Err(RepoError::Validation("No invitees given".into()));
        }
        self.check_write()?;
        let mut t = self.tables.lock().unwrap();
        let now = now_millis();
        let mut created = Vec::new();
        for &invitee_id in invitee_ids {
            let exists = t
                .invitations
                .values()
                .any(|i| i.evaluation_id == evaluation_id && i.invitee_id == invitee_id);
            if exists {
                continue;
            }
            let invitation = Invitation {
                id: t.id(),
                evaluation_id,
                inviter_id,
                invitee_id,
                status: InvitationStatus::Pending,
                message: message.to_string(),
                created_at: now,
                updated_at: now,
            };
            t.invitations.insert(invitation.id, invitation.clone());
            for &item_id in item_ids {
                let id = t.id();
                t.invited_scores.insert(
                    id,
                    InvitedScore {
                        id,
                        invitation_id: invitation.id,
                        item_id,
                        score: None,
                        comment: String::new(),
                        updated_at: now,
                    },
                );
            }
            created.push(invitation);
        }
        Ok(created)
    }

    async fn find_invitation(&self, id: i64) -> RepoResult<Option<Invitation>> {
        Ok(self.tables.lock().unwrap().invitations.get(&id).cloned())
    }

    async fn list_invitations(&self, evaluation_id: i64) -> RepoResult<Vec<Invitation>> {
        let t = self.tables.lock().unwrap();
        Ok(t.invitations
            .values()
            .filter(|i| i.evaluation_id == evaluation_id)
            .cloned()
            .collect())
    }

    async fn list_invitee_invitations(
        &self,
        invitee_id: i64,
        filter: &InvitationFilter,
        page: &PaginationQuery,
    ) -> RepoResult<(Vec<Invitation>, u64)> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<Invitation> = t
            .invitations
            .values()
            .filter(|i| i.invitee_id == invitee_id)
            .filter(|i| filter.status.is_none_or(|s| i.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(rows, page))
    }

    async fn count_invitations(
        &self,
        invitee_id: i64,
        status: InvitationStatus,
    ) -> RepoResult<u64> {
        let t = self.tables.lock().unwrap();
        Ok(t.invitations
            .values()
            .filter(|i| i.invitee_id == invitee_id && i.status == status)
            .count() as u64)
    }

    async fn transition_invitation(
        &self,
        id: i64,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> RepoResult<Option<Invitation>> {
        self.check_write()?;
        let mut t = self.tables.lock().unwrap();
        match t.invitations.get_mut(&id) {
            Some(i) if i.status == from => {
                i.status = to;
                i.updated_at = now_millis();
                Ok(Some(i.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_invitation(&self, id: i64) -> RepoResult<()> {
        self.check_write()?;
        let mut t = self.tables.lock().unwrap();
        if t.invitations.remove(&id).is_none() {
            return Err(RepoError::NotFound(format!("Invitation {id}")));
        }
        t.invited_scores.retain(|_, s| s.invitation_id != id);
        Ok(())
    }

    async fn find_invited_score(&self, id: i64) -> RepoResult<Option<InvitedScore>> {
        Ok(self.tables.lock().unwrap().invited_scores.get(&id).cloned())
    }

    async fn list_invited_scores(&self, invitation_id: i64) -> RepoResult<Vec<InvitedScore>> {
        let t = self.tables.lock().unwrap();
        Ok(t.invited_scores
            .values()
            .filter(|s| s.invitation_id == invitation_id)
            .cloned()
            .collect())
    }

    async fn update_invited_score(
        &self,
        id: i64,
        update: &InvitedScoreUpdate,
    ) -> RepoResult<InvitedScore> {
        self.check_write()?;
        let mut t = self.tables.lock().unwrap();
        let Some(s) = t.invited_scores.get_mut(&id) else {
            return Err(RepoError::NotFound(format!("Invited score {id}")));
        };
        s.score = update.score;
        s.comment = update.comment.clone();
        s.updated_at = now_millis();
        Ok(s.clone())
    }
}
