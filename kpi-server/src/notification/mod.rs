//! Notification fan-out
//!
//! Turns a domain event into one personalised [`LiveMessage`] per affected
//! user and hands them to the [`LiveHub`]. Best effort: failures are logged
//! and never reach the operation that raised the event.

mod message;

pub use message::{MessageContext, Relation, compose};

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use shared::models::{
    Employee, Evaluation, Invitation, InvitedScore, Role, Score, ScoreField,
};
use shared::{EventType, LiveMessage, NotificationData};

use crate::db::EvaluationStore;
use crate::error::ServiceResult;
use crate::live::LiveHub;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationChange {
    Created,
    Updated,
    Deleted,
    StatusChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationChange {
    Created,
    Deleted,
    StatusChanged,
}

/// A state change worth telling people about, with the entity it concerns
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    Evaluation {
        change: EvaluationChange,
        evaluation: Evaluation,
    },
    Invitation {
        change: InvitationChange,
        invitation: Invitation,
    },
    Score {
        field: ScoreField,
        score: Score,
    },
    InvitedScore {
        score: InvitedScore,
    },
}

impl NotificationEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Evaluation { change, .. } => match change {
                EvaluationChange::Created => EventType::EvaluationCreated,
                EvaluationChange::Updated => EventType::EvaluationUpdated,
                EvaluationChange::Deleted => EventType::EvaluationDeleted,
                EvaluationChange::StatusChanged => EventType::EvaluationStatusChanged,
            },
            Self::Invitation { change, .. } => match change {
                InvitationChange::Created => EventType::InvitationCreated,
                InvitationChange::Deleted => EventType::InvitationDeleted,
                InvitationChange::StatusChanged => EventType::InvitationStatusChanged,
            },
            Self::Score { field, .. } => match field {
                ScoreField::SelfReview => EventType::SelfScoreUpdated,
                ScoreField::Manager => EventType::ManagerScoreUpdated,
                ScoreField::Hr => EventType::HrScoreUpdated,
                ScoreField::Final => EventType::FinalScoreUpdated,
            },
            Self::InvitedScore { .. } => EventType::InvitedScoreUpdated,
        }
    }

    fn entity_id(&self) -> i64 {
        match self {
            Self::Evaluation { evaluation, .. } => evaluation.id,
            Self::Invitation { invitation, .. } => invitation.id,
            Self::Score { score, .. } => score.id,
            Self::InvitedScore { score } => score.id,
        }
    }

    fn entity_json(&self) -> serde_json::Value {
        fn to_json<T: Serialize>(v: &T) -> serde_json::Value {
            serde_json::to_value(v).unwrap_or_default()
        }
        match self {
            Self::Evaluation { evaluation, .. } => to_json(evaluation),
            Self::Invitation { invitation, .. } => to_json(invitation),
            Self::Score { score, .. } => to_json(score),
            Self::InvitedScore { score } => to_json(score),
        }
    }
}

/// One message addressed to one user
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub user_id: i64,
    pub relation: Relation,
    pub message: LiveMessage,
}

/// Everything an event's audience and text depend on
#[derive(Default)]
struct EventContext {
    evaluation: Option<Evaluation>,
    subject: Option<Employee>,
    invitation: Option<Invitation>,
    invitee: Option<Employee>,
    template_name: String,
}

/// Ordered, de-duplicated recipient list; first relation wins
#[derive(Default)]
struct Audience(Vec<(i64, Relation)>);

impl Audience {
    fn add(&mut self, user_id: Option<i64>, relation: Relation) {
        if let Some(id) = user_id
            && !self.0.iter().any(|(existing, _)| *existing == id)
        {
            self.0.push((id, relation));
        }
    }

    fn add_all(&mut self, ids: &[i64], relation: Relation) {
        for id in ids {
            self.add(Some(*id), relation);
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn EvaluationStore>,
    live: LiveHub,
}

impl Notifier {
    pub fn new(store: Arc<dyn EvaluationStore>, live: LiveHub) -> Self {
        Self { store, live }
    }

    /// Fire-and-forget fan-out of `event`
    pub fn send_notification(&self, operator_id: i64, event: NotificationEvent) {
        let notifier = self.clone();
        tokio::spawn(async move {
            let event_type = event.event_type();
            match notifier.dispatch(operator_id, &event).await {
                Ok(delivered) => {
                    tracing::debug!(operator_id, event = %event_type, delivered, "Notification dispatched");
                }
                Err(e) => {
                    tracing::warn!(operator_id, event = %event_type, error = ?e, "Notification dispatch failed");
                }
            }
        });
    }

    /// Build and deliver every message for `event`; returns the number of
    /// connections that accepted one.
    pub async fn dispatch(&self, operator_id: i64, event: &NotificationEvent) -> ServiceResult<usize> {
        let outgoing = self.prepare(operator_id, event).await?;
        let mut delivered = 0;
        for out in &outgoing {
            let sent = self.live.send_to_user(out.user_id, &out.message).await;
            tracing::trace!(user_id = out.user_id, relation = ?out.relation, sent, "Notification routed");
            delivered += sent;
        }
        Ok(delivered)
    }

    /// Resolve the audience of `event` and compose each recipient's message.
    ///
    /// The operator never receives their own notification. An unknown
    /// operator yields no messages.
    pub async fn prepare(
        &self,
        operator_id: i64,
        event: &NotificationEvent,
    ) -> ServiceResult<Vec<Outgoing>> {
        let Some(operator) = self.store.find_employee(operator_id).await? else {
            tracing::warn!(operator_id, "Notification operator not found, skipping");
            return Ok(Vec::new());
        };

        let ctx = self.load_context(event).await?;
        let hr_ids = self.store.list_employee_ids_by_role(Role::Hr).await?;

        let subject_id = ctx.subject.as_ref().map(|e| e.id);
        let manager_id = ctx.subject.as_ref().and_then(|e| e.manager_id);

        let mut audience = Audience::default();
        match event {
            NotificationEvent::Evaluation { .. } | NotificationEvent::Score { .. } => {
                audience.add(subject_id, Relation::Subject);
                audience.add(manager_id, Relation::Manager);
                audience.add_all(&hr_ids, Relation::Hr);
            }
            NotificationEvent::Invitation { .. } | NotificationEvent::InvitedScore { .. } => {
                audience.add(ctx.invitation.as_ref().map(|i| i.invitee_id), Relation::Invitee);
                audience.add(subject_id, Relation::Subject);
                audience.add(manager_id, Relation::Manager);
                audience.add(ctx.invitation.as_ref().map(|i| i.inviter_id), Relation::Inviter);
                audience.add_all(&hr_ids, Relation::Hr);
            }
        }

        let event_type = event.event_type();
        let text_ctx = MessageContext {
            operator_name: operator.name.clone(),
            subject_name: ctx.subject.as_ref().map(|e| e.name.clone()).unwrap_or_default(),
            template_name: ctx.template_name.clone(),
            period: ctx
                .evaluation
                .as_ref()
                .map(Evaluation::period_label)
                .unwrap_or_default(),
            evaluation_status: ctx
                .evaluation
                .as_ref()
                .map(|e| e.status.label().to_string())
                .unwrap_or_default(),
            invitee_name: ctx.invitee.as_ref().map(|e| e.name.clone()).unwrap_or_default(),
            invitation_status: ctx
                .invitation
                .as_ref()
                .map(|i| i.status.label().to_string())
                .unwrap_or_default(),
            score_field: match event {
                NotificationEvent::Score { field, .. } => Some(*field),
                _ => None,
            },
        };

        let mut payload = event.entity_json();
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("period_label".into(), text_ctx.period.clone().into());
            obj.insert("template_name".into(), text_ctx.template_name.clone().into());
        }

        let now = Utc::now();
        let outgoing = audience
            .0
            .into_iter()
            .filter(|(user_id, _)| *user_id != operator_id)
            .map(|(user_id, relation)| {
                let data = NotificationData {
                    id: event.entity_id(),
                    employee_id: subject_id.unwrap_or_default(),
                    operator_id,
                    operator_name: operator.name.clone(),
                    message: compose(event_type, relation, &text_ctx),
                    timestamp: now,
                    payload: payload.clone(),
                };
                Outgoing {
                    user_id,
                    relation,
                    message: LiveMessage::event(event_type, &data),
                }
            })
            .collect();

        Ok(outgoing)
    }

    async fn load_context(&self, event: &NotificationEvent) -> ServiceResult<EventContext> {
        let mut ctx = EventContext::default();

        let evaluation_id = match event {
            NotificationEvent::Evaluation { evaluation, .. } => {
                ctx.evaluation = Some(evaluation.clone());
                None
            }
            NotificationEvent::Invitation { invitation, .. } => {
                ctx.invitation = Some(invitation.clone());
                Some(invitation.evaluation_id)
            }
            NotificationEvent::Score { score, .. } => Some(score.evaluation_id),
            NotificationEvent::InvitedScore { score } => {
                ctx.invitation = self.store.find_invitation(score.invitation_id).await?;
                ctx.invitation.as_ref().map(|i| i.evaluation_id)
            }
        };

        if let Some(id) = evaluation_id {
            ctx.evaluation = self.store.find_evaluation(id).await?;
        }

        if let Some(evaluation) = &ctx.evaluation {
            ctx.subject = self.store.find_employee(evaluation.employee_id).await?;
            ctx.template_name = self
                .store
                .find_template(evaluation.template_id)
                .await?
                .map(|t| t.name)
                .unwrap_or_default();
        }
        if let Some(invitation) = &ctx.invitation {
            ctx.invitee = self.store.find_employee(invitation.invitee_id).await?;
        }

        Ok(ctx)
    }
}
