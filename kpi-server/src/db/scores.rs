use shared::models::{Score, ScoreField, ScoreUpdate};
use shared::util::now_millis;
use sqlx::PgPool;

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Score>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM kpi_scores WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_evaluation(
    pool: &PgPool,
    evaluation_id: i64,
) -> Result<Vec<Score>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT s.* FROM kpi_scores s
        JOIN kpi_items i ON i.id = s.item_id
        WHERE s.evaluation_id = $1
        ORDER BY i.sort_order, s.id
        "#,
    )
    .bind(evaluation_id)
    .fetch_all(pool)
    .await
}

/// Overwrite the score/comment pair selected by `field`
pub async fn update(
    pool: &PgPool,
    id: i64,
    field: ScoreField,
    update: &ScoreUpdate,
) -> Result<Option<Score>, sqlx::Error> {
    let sql = match field {
        ScoreField::SelfReview => {
            "UPDATE kpi_scores SET self_score = $2, self_comment = $3, updated_at = $4
             WHERE id = $1 RETURNING *"
        }
        ScoreField::Manager => {
            "UPDATE kpi_scores SET manager_score = $2, manager_comment = $3, manager_auto = FALSE,
                 updated_at = $4
             WHERE id = $1 RETURNING *"
        }
        ScoreField::Hr => {
            "UPDATE kpi_scores SET hr_score = $2, hr_comment = $3, updated_at = $4
             WHERE id = $1 RETURNING *"
        }
        ScoreField::Final => {
            "UPDATE kpi_scores SET final_score = $2, final_comment = $3, updated_at = $4
             WHERE id = $1 RETURNING *"
        }
    };

    sqlx::query_as(sql)
        .bind(id)
        .bind(update.score)
        .bind(&update.comment)
        .bind(now_millis())
        .fetch_optional(pool)
        .await
}
