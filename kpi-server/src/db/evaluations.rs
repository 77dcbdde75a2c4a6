use shared::PaginationQuery;
use shared::models::{Evaluation, EvaluationCreate, EvaluationFilter, EvaluationStatus};
use shared::util::now_millis;
use sqlx::PgPool;

use super::{EvaluationPatch, RepoError, RepoResult};

pub async fn create(
    pool: &PgPool,
    data: &EvaluationCreate,
    item_ids: &[i64],
) -> RepoResult<Evaluation> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let existing: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT id FROM kpi_evaluations
        WHERE employee_id = $1 AND template_id = $2 AND period = $3 AND year = $4
            AND month IS NOT DISTINCT FROM $5
            AND quarter IS NOT DISTINCT FROM $6
        "#,
    )
    .bind(data.employee_id)
    .bind(data.template_id)
    .bind(data.period)
    .bind(data.year)
    .bind(data.month)
    .bind(data.quarter)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some((id,)) = existing {
        return Err(RepoError::Duplicate(format!("Evaluation {id}")));
    }

    let evaluation: Evaluation = sqlx::query_as(
        r#"
        INSERT INTO kpi_evaluations (
            employee_id, template_id, period, year, month, quarter,
            status, total_score, final_comment, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, 'pending', 0, '', $7, $7)
        RETURNING *
        "#,
    )
    .bind(data.employee_id)
    .bind(data.template_id)
    .bind(data.period)
    .bind(data.year)
    .bind(data.month)
    .bind(data.quarter)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO kpi_scores (evaluation_id, item_id, updated_at)
        SELECT $1, item_id, $3 FROM UNNEST($2::BIGINT[]) AS t(item_id)
        "#,
    )
    .bind(evaluation.id)
    .bind(item_ids)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(evaluation)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Evaluation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM kpi_evaluations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(
    pool: &PgPool,
    filter: &EvaluationFilter,
    page: &PaginationQuery,
) -> Result<(Vec<Evaluation>, u64), sqlx::Error> {
    const WHERE: &str = r#"
        WHERE ($1::evaluation_status IS NULL OR status = $1)
            AND ($2::BIGINT IS NULL OR employee_id = $2)
            AND ($3::BIGINT IS NULL OR employee_id IN (
                SELECT id FROM employees WHERE department_id = $3))
            AND ($4::period_kind IS NULL OR period = $4)
            AND ($5::INTEGER IS NULL OR year = $5)
            AND ($6::INTEGER IS NULL OR month = $6)
            AND ($7::INTEGER IS NULL OR quarter = $7)
    "#;

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM kpi_evaluations {WHERE}"))
        .bind(filter.status)
        .bind(filter.employee_id)
        .bind(filter.department_id)
        .bind(filter.period)
        .bind(filter.year)
        .bind(filter.month)
        .bind(filter.quarter)
        .fetch_one(pool)
        .await?;

    let rows: Vec<Evaluation> = sqlx::query_as(&format!(
        "SELECT * FROM kpi_evaluations {WHERE} ORDER BY created_at DESC, id DESC LIMIT $8 OFFSET $9"
    ))
    .bind(filter.status)
    .bind(filter.employee_id)
    .bind(filter.department_id)
    .bind(filter.period)
    .bind(filter.year)
    .bind(filter.month)
    .bind(filter.quarter)
    .bind(page.limit() as i64)
    .bind(page.offset() as i64)
    .fetch_all(pool)
    .await?;

    Ok((rows, total.max(0) as u64))
}

pub async fn list_for_employee(
    pool: &PgPool,
    employee_id: i64,
    statuses: &[EvaluationStatus],
) -> Result<Vec<Evaluation>, sqlx::Error> {
    let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
    sqlx::query_as(
        r#"
        SELECT * FROM kpi_evaluations
        WHERE employee_id = $1
            AND (cardinality($2::TEXT[]) = 0 OR status::TEXT = ANY($2))
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(employee_id)
    .bind(statuses)
    .fetch_all(pool)
    .await
}

pub async fn count_for_employee(
    pool: &PgPool,
    employee_id: i64,
    status: EvaluationStatus,
) -> Result<u64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM kpi_evaluations WHERE employee_id = $1 AND status = $2",
    )
    .bind(employee_id)
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(count.max(0) as u64)
}

/// Apply a patch and its score side effects in one transaction
pub async fn update(pool: &PgPool, id: i64, patch: &EvaluationPatch) -> RepoResult<Evaluation> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    if let Some(fill) = &patch.manager_fill {
        let (ids, values): (Vec<i64>, Vec<f64>) = fill.scores.iter().copied().unzip();
        sqlx::query(
            r#"
            UPDATE kpi_scores s
            SET manager_score = v.value, manager_comment = $3, manager_auto = TRUE, updated_at = $5
            FROM UNNEST($1::BIGINT[], $2::FLOAT8[]) AS v(id, value)
            WHERE s.id = v.id AND s.evaluation_id = $4
            "#,
        )
        .bind(&ids)
        .bind(&values)
        .bind(&fill.comment)
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    if !patch.final_scores.is_empty() {
        let (ids, values): (Vec<i64>, Vec<f64>) = patch.final_scores.iter().copied().unzip();
        sqlx::query(
            r#"
            UPDATE kpi_scores s
            SET final_score = v.value, updated_at = $4
            FROM UNNEST($1::BIGINT[], $2::FLOAT8[]) AS v(id, value)
            WHERE s.id = v.id AND s.evaluation_id = $3
            "#,
        )
        .bind(&ids)
        .bind(&values)
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    let evaluation: Option<Evaluation> = sqlx::query_as(
        r#"
        UPDATE kpi_evaluations
        SET status = COALESCE($2, status),
            final_comment = COALESCE($3, final_comment),
            total_score = COALESCE($4, total_score),
            updated_at = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(patch.status)
    .bind(patch.final_comment.as_deref())
    .bind(patch.total_score)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(evaluation) = evaluation else {
        return Err(RepoError::NotFound(format!("Evaluation {id}")));
    };

    tx.commit().await?;
    Ok(evaluation)
}

/// Remove an evaluation and everything hanging off it
pub async fn delete_cascade(pool: &PgPool, id: i64) -> RepoResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM invited_scores WHERE invitation_id IN (
            SELECT id FROM evaluation_invitations WHERE evaluation_id = $1)
        "#,
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM evaluation_invitations WHERE evaluation_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM kpi_scores WHERE evaluation_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query("DELETE FROM kpi_evaluations WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Evaluation {id}")));
    }

    tx.commit().await?;
    Ok(())
}
