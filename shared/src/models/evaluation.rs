//! Evaluation and Score Models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Review period kind of a template / evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "period_kind", rename_all = "snake_case")
)]
pub enum PeriodKind {
    Monthly,
    Quarterly,
    Yearly,
}

/// Evaluation workflow status
///
/// ```text
/// pending → self_evaluated → manager_evaluated → pending_confirm → completed
///                 │                  ▲
///                 └──(no manager)────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "evaluation_status", rename_all = "snake_case")
)]
pub enum EvaluationStatus {
    Pending,
    SelfEvaluated,
    ManagerEvaluated,
    PendingConfirm,
    Completed,
}

impl EvaluationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::SelfEvaluated => "self_evaluated",
            Self::ManagerEvaluated => "manager_evaluated",
            Self::PendingConfirm => "pending_confirm",
            Self::Completed => "completed",
        }
    }

    /// Text shown to users in notifications
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "awaiting self review",
            Self::SelfEvaluated => "awaiting manager review",
            Self::ManagerEvaluated => "awaiting HR review",
            Self::PendingConfirm => "awaiting confirmation",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One employee's review for one template in one period
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Evaluation {
    pub id: i64,
    pub employee_id: i64,
    pub template_id: i64,
    pub period: PeriodKind,
    pub year: i32,
    pub month: Option<i32>,
    pub quarter: Option<i32>,
    pub status: EvaluationStatus,
    pub total_score: f64,
    pub final_comment: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Evaluation {
    /// "2024-03", "2024-Q1" or "2024"
    pub fn period_label(&self) -> String {
        period_label(self.period, self.year, self.month, self.quarter)
    }
}

pub fn period_label(period: PeriodKind, year: i32, month: Option<i32>, quarter: Option<i32>) -> String {
    match (period, month, quarter) {
        (PeriodKind::Monthly, Some(m), _) => format!("{year}-{m:02}"),
        (PeriodKind::Quarterly, _, Some(q)) => format!("{year}-Q{q}"),
        _ => year.to_string(),
    }
}

/// Create evaluation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationCreate {
    pub employee_id: i64,
    pub template_id: i64,
    pub period: PeriodKind,
    pub year: i32,
    pub month: Option<i32>,
    pub quarter: Option<i32>,
}

/// Partial evaluation update; `status` requests a workflow transition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationUpdate {
    pub status: Option<EvaluationStatus>,
    pub final_comment: Option<String>,
}

/// List filter for evaluations (all fields optional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationFilter {
    pub status: Option<EvaluationStatus>,
    pub employee_id: Option<i64>,
    pub department_id: Option<i64>,
    pub period: Option<PeriodKind>,
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub quarter: Option<i32>,
}

/// Evaluation together with its score rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationDetail {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    pub scores: Vec<Score>,
}

/// One scored item of an evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Score {
    pub id: i64,
    pub evaluation_id: i64,
    pub item_id: i64,
    pub self_score: Option<f64>,
    pub self_comment: String,
    pub manager_score: Option<f64>,
    pub manager_comment: String,
    /// Set when manager_score was copied from self_score
    pub manager_auto: bool,
    pub hr_score: Option<f64>,
    pub hr_comment: String,
    pub final_score: Option<f64>,
    pub final_comment: String,
    pub updated_at: i64,
}

impl Score {
    /// Highest-authority score present: HR, then manager, then self, else 0
    pub fn authoritative_score(&self) -> f64 {
        self.hr_score
            .or(self.manager_score)
            .or(self.self_score)
            .unwrap_or(0.0)
    }
}

/// Which column of a score row an update targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreField {
    #[serde(rename = "self")]
    SelfReview,
    Manager,
    Hr,
    Final,
}

impl ScoreField {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SelfReview => "self",
            Self::Manager => "manager",
            Self::Hr => "hr",
            Self::Final => "final",
        }
    }
}

/// Score update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub score: Option<f64>,
    #[serde(default)]
    pub comment: String,
}
