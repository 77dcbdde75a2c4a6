//! KPI Template Model

use serde::{Deserialize, Serialize};

use super::evaluation::PeriodKind;

/// KPI template; its items become the score rows of every evaluation using it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct KpiTemplate {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub period: PeriodKind,
    pub is_active: bool,
}

/// Scored item of a template
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct KpiItem {
    pub id: i64,
    pub template_id: i64,
    pub name: String,
    pub description: String,
    pub max_score: f64,
    pub sort_order: i32,
}
