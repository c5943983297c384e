use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::models::User;

pub async fn create<'e, E: PgExecutor<'e>>(user: &User, conn: E) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, email, pwd_hash, role, organization_name, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *",
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.pwd_hash)
    .bind(user.role)
    .bind(&user.organization_name)
    .bind(user.created_at)
    .fetch_one(conn)
    .await
}

pub async fn get_by_id<'e, E: PgExecutor<'e>>(id: Uuid, conn: E) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn get_by_email<'e, E: PgExecutor<'e>>(email: &str, conn: E) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
        .bind(email)
        .fetch_optional(conn)
        .await
}
