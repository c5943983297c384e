use sqlx::{postgres::PgExecutor, types::Json};
use uuid::Uuid;

use crate::models::Payment;

pub async fn create<'e, E: PgExecutor<'e>>(payment: &Payment, conn: E) -> Result<Payment, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        "INSERT INTO payments (id, user_id, ticket_id, event_id, amount, currency, status,
            payment_method, transaction_id, gateway_name, gateway_transaction_id, history,
            created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *",
    )
    .bind(payment.id)
    .bind(payment.user_id)
    .bind(payment.ticket_id)
    .bind(payment.event_id)
    .bind(payment.amount)
    .bind(&payment.currency)
    .bind(payment.status)
    .bind(payment.payment_method)
    .bind(&payment.transaction_id)
    .bind(payment.gateway.name)
    .bind(&payment.gateway.transaction_id)
    .bind(Json(&payment.history))
    .bind(payment.created_at)
    .bind(payment.updated_at)
    .fetch_one(conn)
    .await
}

pub async fn get_by_transaction_id<'e, E: PgExecutor<'e>>(
    transaction_id: &str,
    conn: E,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE transaction_id = $1")
        .bind(transaction_id)
        .fetch_optional(conn)
        .await
}

pub async fn get_all_for_user<'e, E: PgExecutor<'e>>(user_id: Uuid, conn: E) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}
