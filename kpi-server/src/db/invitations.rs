use std::collections::HashSet;

use shared::PaginationQuery;
use shared::models::{
    Invitation, InvitationFilter, InvitationStatus, InvitedScore, InvitedScoreUpdate,
};
use shared::util::now_millis;
use sqlx::PgPool;

use super::{RepoError, RepoResult};

/// Invite every id in `invitee_ids` that has no invitation for the evaluation yet
pub async fn create_batch(
    pool: &PgPool,
    evaluation_id: i64,
    inviter_id: i64,
    invitee_ids: &[i64],
    message: &str,
    item_ids: &[i64],
) -> RepoResult<Vec<Invitation>> {
    if invitee_ids.is_empty() {
        return Err(RepoError::Validation("No invitees given".into()));
    }
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let existing: Vec<i64> =
        sqlx::query_scalar("SELECT invitee_id FROM evaluation_invitations WHERE evaluation_id = $1")
            .bind(evaluation_id)
            .fetch_all(&mut *tx)
            .await?;
    let mut seen: HashSet<i64> = existing.into_iter().collect();

    let mut created = Vec::new();
    for &invitee_id in invitee_ids {
        if !seen.insert(invitee_id) {
            continue;
        }

        let invitation: Option<Invitation> = sqlx::query_as(
            r#"
            INSERT INTO evaluation_invitations (
                evaluation_id, inviter_id, invitee_id, status, message, created_at, updated_at
            )
            VALUES ($1, $2, $3, 'pending', $4, $5, $5)
            ON CONFLICT (evaluation_id, invitee_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(evaluation_id)
        .bind(inviter_id)
        .bind(invitee_id)
        .bind(message)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        // Lost a race with a concurrent batch
        let Some(invitation) = invitation else {
            continue;
        };

        sqlx::query(
            r#"
            INSERT INTO invited_scores (invitation_id, item_id, updated_at)
            SELECT $1, item_id, $3 FROM UNNEST($2::BIGINT[]) AS t(item_id)
            "#,
        )
        .bind(invitation.id)
        .bind(item_ids)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        created.push(invitation);
    }

    tx.commit().await?;
    Ok(created)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Invitation>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM evaluation_invitations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_evaluation(
    pool: &PgPool,
    evaluation_id: i64,
) -> Result<Vec<Invitation>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM evaluation_invitations WHERE evaluation_id = $1 ORDER BY created_at, id",
    )
    .bind(evaluation_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_invitee(
    pool: &PgPool,
    invitee_id: i64,
    filter: &InvitationFilter,
    page: &PaginationQuery,
) -> Result<(Vec<Invitation>, u64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM evaluation_invitations
        WHERE invitee_id = $1 AND ($2::invitation_status IS NULL OR status = $2)
        "#,
    )
    .bind(invitee_id)
    .bind(filter.status)
    .fetch_one(pool)
    .await?;

    let rows: Vec<Invitation> = sqlx::query_as(
        r#"
        SELECT * FROM evaluation_invitations
        WHERE invitee_id = $1 AND ($2::invitation_status IS NULL OR status = $2)
        ORDER BY created_at DESC, id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(invitee_id)
    .bind(filter.status)
    .bind(page.limit() as i64)
    .bind(page.offset() as i64)
    .fetch_all(pool)
    .await?;

    Ok((rows, total.max(0) as u64))
}

pub async fn count_for_invitee(
    pool: &PgPool,
    invitee_id: i64,
    status: InvitationStatus,
) -> Result<u64, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM evaluation_invitations WHERE invitee_id = $1 AND status = $2",
    )
    .bind(invitee_id)
    .bind(status)
    .fetch_one(pool)
    .await?;
    Ok(count.max(0) as u64)
}

/// Compare-and-set on the status column
pub async fn transition(
    pool: &PgPool,
    id: i64,
    from: InvitationStatus,
    to: InvitationStatus,
) -> Result<Option<Invitation>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE evaluation_invitations SET status = $3, updated_at = $4
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

pub async fn delete_cascade(pool: &PgPool, id: i64) -> RepoResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM invited_scores WHERE invitation_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let deleted = sqlx::query("DELETE FROM evaluation_invitations WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Invitation {id}")));
    }

    tx.commit().await?;
    Ok(())
}

pub async fn find_score(pool: &PgPool, id: i64) -> Result<Option<InvitedScore>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM invited_scores WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_scores(
    pool: &PgPool,
    invitation_id: i64,
) -> Result<Vec<InvitedScore>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT s.* FROM invited_scores s
        JOIN kpi_items i ON i.id = s.item_id
        WHERE s.invitation_id = $1
        ORDER BY i.sort_order, s.id
        "#,
    )
    .bind(invitation_id)
    .fetch_all(pool)
    .await
}

pub async fn update_score(
    pool: &PgPool,
    id: i64,
    update: &InvitedScoreUpdate,
) -> Result<Option<InvitedScore>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE invited_scores SET score = $2, comment = $3, updated_at = $4
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(update.score)
    .bind(&update.comment)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}
