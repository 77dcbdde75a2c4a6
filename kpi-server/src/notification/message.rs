//! Per-recipient message text

use shared::EventType;
use shared::models::ScoreField;

/// How a recipient relates to the entity an event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// The evaluated employee
    Subject,
    /// The evaluated employee's direct manager
    Manager,
    Invitee,
    Inviter,
    Hr,
}

/// Names and labels a message may mention
#[derive(Debug, Clone, Default)]
pub struct MessageContext {
    pub operator_name: String,
    pub subject_name: String,
    pub template_name: String,
    pub period: String,
    pub evaluation_status: String,
    pub invitee_name: String,
    pub invitation_status: String,
    pub score_field: Option<ScoreField>,
}

impl MessageContext {
    fn score_label(&self) -> &'static str {
        match self.score_field {
            Some(ScoreField::SelfReview) => "self",
            Some(ScoreField::Manager) => "manager",
            Some(ScoreField::Hr) => "HR",
            Some(ScoreField::Final) => "final",
            None => "",
        }
    }
}

enum Framing {
    FirstPerson,
    Subordinate,
    Invited,
    ThirdPerson,
}

fn framing(event_type: EventType, relation: Relation) -> Framing {
    match relation {
        Relation::Subject => Framing::FirstPerson,
        Relation::Manager => Framing::Subordinate,
        Relation::Invitee if is_invitation_event(event_type) => Framing::Invited,
        Relation::Invitee | Relation::Inviter | Relation::Hr => Framing::ThirdPerson,
    }
}

fn is_invitation_event(event_type: EventType) -> bool {
    matches!(
        event_type,
        EventType::InvitationCreated
            | EventType::InvitationUpdated
            | EventType::InvitationDeleted
            | EventType::InvitationStatusChanged
            | EventType::InvitedScoreUpdated
    )
}

/// Message text for one recipient
pub fn compose(event_type: EventType, relation: Relation, ctx: &MessageContext) -> String {
    let MessageContext {
        operator_name: op,
        subject_name: subject,
        template_name: template,
        period,
        evaluation_status: status,
        invitee_name: invitee,
        invitation_status: inv_status,
        ..
    } = ctx;
    let f = framing(event_type, relation);

    match event_type {
        EventType::EvaluationCreated => match f {
            Framing::FirstPerson => {
                format!("A new {template} review for {period} has been created for you")
            }
            Framing::Subordinate => format!(
                "A {template} review for {period} has been created for your subordinate {subject}"
            ),
            _ => format!("{op} created a {template} review for {subject} ({period})"),
        },
        EventType::EvaluationUpdated => match f {
            Framing::FirstPerson => {
                format!("Your {template} review for {period} was updated by {op}")
            }
            Framing::Subordinate => format!(
                "The {template} review of your subordinate {subject} ({period}) was updated by {op}"
            ),
            _ => format!("{op} updated the {template} review of {subject} ({period})"),
        },
        EventType::EvaluationDeleted => match f {
            Framing::FirstPerson => {
                format!("Your {template} review for {period} was deleted by {op}")
            }
            Framing::Subordinate => format!(
                "The {template} review of your subordinate {subject} ({period}) was deleted"
            ),
            _ => format!("{op} deleted the {template} review of {subject} ({period})"),
        },
        EventType::EvaluationStatusChanged => match f {
            Framing::FirstPerson => {
                format!("Your {template} review for {period} is now {status}")
            }
            Framing::Subordinate => format!(
                "The {template} review of your subordinate {subject} ({period}) is now {status}"
            ),
            _ => format!("The {template} review of {subject} ({period}) is now {status}"),
        },
        EventType::InvitationCreated => match f {
            Framing::Invited => format!(
                "{op} invited you to score the {template} review of {subject} ({period})"
            ),
            Framing::FirstPerson => format!(
                "{invitee} was invited to score your {template} review ({period})"
            ),
            Framing::Subordinate => format!(
                "{invitee} was invited to score the review of your subordinate {subject} ({period})"
            ),
            Framing::ThirdPerson => format!(
                "{op} invited {invitee} to score the review of {subject} ({period})"
            ),
        },
        EventType::InvitationUpdated => match f {
            Framing::Invited => format!(
                "Your invitation to score the review of {subject} ({period}) was updated"
            ),
            _ => format!(
                "The invitation for {invitee} to score the review of {subject} ({period}) was updated"
            ),
        },
        EventType::InvitationDeleted => match f {
            Framing::Invited => format!(
                "Your invitation to score the review of {subject} ({period}) was withdrawn"
            ),
            _ => format!(
                "The invitation for {invitee} to score the review of {subject} ({period}) was withdrawn"
            ),
        },
        EventType::InvitationStatusChanged => match f {
            Framing::Invited => format!(
                "Your invitation to score the review of {subject} ({period}) is now {inv_status}"
            ),
            Framing::FirstPerson => format!(
                "The invitation for {invitee} to score your review ({period}) is now {inv_status}"
            ),
            _ => format!(
                "The invitation for {invitee} to score the review of {subject} ({period}) is now {inv_status}"
            ),
        },
        EventType::InvitedScoreUpdated => match f {
            Framing::Invited => format!(
                "Your peer score on the review of {subject} ({period}) was updated"
            ),
            Framing::FirstPerson => format!(
                "{invitee} submitted a peer score on your {template} review ({period})"
            ),
            Framing::Subordinate => format!(
                "{invitee} submitted a peer score on the review of your subordinate {subject} ({period})"
            ),
            Framing::ThirdPerson => format!(
                "{invitee} submitted a peer score on the review of {subject} ({period})"
            ),
        },
        EventType::SelfScoreUpdated
        | EventType::ManagerScoreUpdated
        | EventType::HrScoreUpdated
        | EventType::FinalScoreUpdated => {
            let label = ctx.score_label();
            match f {
                Framing::FirstPerson => format!(
                    "The {label} score on your {template} review ({period}) was updated by {op}"
                ),
                Framing::Subordinate => format!(
                    "{op} updated the {label} score on the review of your subordinate {subject} ({period})"
                ),
                _ => format!(
                    "{op} updated the {label} score on the review of {subject} ({period})"
                ),
            }
        }
    }
}
