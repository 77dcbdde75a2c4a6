use shared::models::{Employee, Role};
use sqlx::PgPool;

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, name, email, position, department_id, manager_id, role, is_active, created_at
         FROM employees WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_ids_by_role(pool: &PgPool, role: Role) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM employees WHERE role = $1 AND is_active ORDER BY id")
        .bind(role)
        .fetch_all(pool)
        .await
}
