use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::models::Event;

pub async fn create<'e, E: PgExecutor<'e>>(event: &Event, conn: E) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        "INSERT INTO events (id, title, description, category, start_date, end_date, timezone,
            price_amount, currency, early_bird_price, early_bird_end_date, vip_price,
            total_tickets, sold_tickets, reserved_tickets, status, organizer_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
        RETURNING *",
    )
    .bind(event.id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.category)
    .bind(event.schedule.start_date)
    .bind(event.schedule.end_date)
    .bind(&event.schedule.timezone)
    .bind(event.price.amount)
    .bind(&event.price.currency)
    .bind(event.price.early_bird_price)
    .bind(event.price.early_bird_end_date)
    .bind(event.price.vip_price)
    .bind(event.available_tickets.total)
    .bind(event.available_tickets.sold)
    .bind(event.available_tickets.reserved)
    .bind(event.status)
    .bind(event.organizer_id)
    .bind(event.created_at)
    .bind(event.updated_at)
    .fetch_one(conn)
    .await
}

/// Writes the organizer-editable columns. The sold and reserved counters are
/// left alone; the update is refused (`None`) when the new capacity would fall
/// below them.
pub async fn update<'e, E: PgExecutor<'e>>(event: &Event, conn: E) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        "UPDATE events
        SET title = $2, description = $3, category = $4, start_date = $5, end_date = $6, timezone = $7,
            price_amount = $8, currency = $9, early_bird_price = $10, early_bird_end_date = $11,
            vip_price = $12, total_tickets = $13, status = $14, updated_at = $15
        WHERE id = $1
            AND ($13::INTEGER IS NULL OR $13::INTEGER >= sold_tickets + reserved_tickets)
        RETURNING *",
    )
    .bind(event.id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.category)
    .bind(event.schedule.start_date)
    .bind(event.schedule.end_date)
    .bind(&event.schedule.timezone)
    .bind(event.price.amount)
    .bind(&event.price.currency)
    .bind(event.price.early_bird_price)
    .bind(event.price.early_bird_end_date)
    .bind(event.price.vip_price)
    .bind(event.available_tickets.total)
    .bind(event.status)
    .bind(event.updated_at)
    .fetch_optional(conn)
    .await
}

pub async fn get_by_id<'e, E: PgExecutor<'e>>(id: Uuid, conn: E) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn get_all<'e, E: PgExecutor<'e>>(conn: E) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY start_date ASC")
        .fetch_all(conn)
        .await
}

pub async fn exists<'e, E: PgExecutor<'e>>(id: Uuid, conn: E) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)")
        .bind(id)
        .fetch_one(conn)
        .await
}

/// Adds `quantity` to the sold counter if capacity allows and the counter
/// stays within `INTEGER`. Returns `false` when no row was updated (unknown
/// event or not enough tickets left).
pub async fn add_sold<'e, E: PgExecutor<'e>>(id: Uuid, quantity: i32, conn: E) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE events
        SET sold_tickets = sold_tickets + $2, updated_at = now()
        WHERE id = $1
            AND sold_tickets::BIGINT + $2 <= 2147483647
            AND (total_tickets IS NULL OR total_tickets - sold_tickets - reserved_tickets >= $2)",
    )
    .bind(id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}
