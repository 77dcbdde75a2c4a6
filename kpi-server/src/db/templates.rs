use shared::models::{KpiItem, KpiTemplate};
use sqlx::PgPool;

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<KpiTemplate>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, name, description, period, is_active FROM kpi_templates WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_items(pool: &PgPool, template_id: i64) -> Result<Vec<KpiItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, template_id, name, description, max_score, sort_order
         FROM kpi_items WHERE template_id = $1 ORDER BY sort_order, id",
    )
    .bind(template_id)
    .fetch_all(pool)
    .await
}
