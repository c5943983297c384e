use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::models::Ticket;

pub async fn create<'e, E: PgExecutor<'e>>(ticket: &Ticket, conn: E) -> Result<Ticket, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(
        "INSERT INTO tickets (id, event_id, user_id, ticket_type, ticket_number, ticket_code, quantity,
            price_amount, total_amount, currency, status, checked_in, check_in_time,
            payment_method, payment_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING *",
    )
    .bind(ticket.id)
    .bind(ticket.event_id)
    .bind(ticket.user_id)
    .bind(ticket.ticket_type)
    .bind(&ticket.ticket_number)
    .bind(&ticket.ticket_code)
    .bind(ticket.quantity)
    .bind(ticket.price.amount)
    .bind(ticket.total_price.amount)
    .bind(&ticket.price.currency)
    .bind(ticket.status)
    .bind(ticket.checked_in)
    .bind(ticket.check_in_time)
    .bind(ticket.payment_method)
    .bind(&ticket.payment_id)
    .bind(ticket.created_at)
    .bind(ticket.updated_at)
    .fetch_one(conn)
    .await
}

pub async fn get_by_id<'e, E: PgExecutor<'e>>(id: Uuid, conn: E) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn get_by_code<'e, E: PgExecutor<'e>>(code: &str, conn: E) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE ticket_code = $1")
        .bind(code)
        .fetch_optional(conn)
        .await
}

pub async fn get_for_user<'e, E: PgExecutor<'e>>(
    event_id: Uuid,
    user_id: Uuid,
    conn: E,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>(
        "SELECT * FROM tickets WHERE event_id = $1 AND user_id = $2 ORDER BY created_at ASC LIMIT 1",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await
}

pub async fn get_all_for_user<'e, E: PgExecutor<'e>>(user_id: Uuid, conn: E) -> Result<Vec<Ticket>, sqlx::Error> {
    sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Conditional on `checked_in = FALSE`, so two concurrent scans cannot both
/// report a fresh check-in. Returns the number of rows changed (0 or 1).
pub async fn mark_checked_in<'e, E: PgExecutor<'e>>(
    id: Uuid,
    at: DateTime<Utc>,
    conn: E,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE tickets
        SET checked_in = TRUE, check_in_time = $2, updated_at = $2
        WHERE id = $1 AND checked_in = FALSE",
    )
    .bind(id)
    .bind(at)
    .execute(conn)
    .await?;
    Ok(res.rows_affected())
}
