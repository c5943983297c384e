use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::{
    db,
    models::{Event, Payment, Ticket, User},
    PGPool,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PGPool,
}

impl PgStore {
    pub fn new(pool: PGPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        Ok(db::user::create(&user, &self.pool).await?)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(db::user::get_by_id(id, &self.pool).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(db::user::get_by_email(email, &self.pool).await?)
    }

    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        Ok(db::event::create(&event, &self.pool).await?)
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(db::event::get_by_id(id, &self.pool).await?)
    }

    async fn update_event(&self, event: Event) -> StoreResult<Event> {
        let mut tx = self.pool.begin().await?;
        let updated = db::event::update(&event, &mut *tx).await?;
        let updated = match updated {
            Some(updated) => updated,
            None if db::event::exists(event.id, &mut *tx).await? => return Err(StoreError::SoldOut),
            None => return Err(StoreError::NotFound),
        };
        tx.commit().await?;
        Ok(updated)
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        Ok(db::event::get_all(&self.pool).await?)
    }

    async fn find_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        Ok(db::ticket::get_by_id(id, &self.pool).await?)
    }

    async fn find_ticket_by_code(&self, code: &str) -> StoreResult<Option<Ticket>> {
        Ok(db::ticket::get_by_code(code, &self.pool).await?)
    }

    async fn find_ticket_for_user(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Ticket>> {
        Ok(db::ticket::get_for_user(event_id, user_id, &self.pool).await?)
    }

    async fn list_tickets_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Ticket>> {
        Ok(db::ticket::get_all_for_user(user_id, &self.pool).await?)
    }

    async fn issue_ticket(&self, ticket: Ticket) -> StoreResult<Ticket> {
        let mut tx = self.pool.begin().await?;
        reserve(&mut tx, ticket.event_id, ticket.quantity).await?;
        let created = db::ticket::create(&ticket, &mut *tx).await?;
        tx.commit().await?;
        debug!("ticket {} committed", created.ticket_number);
        Ok(created)
    }

    async fn issue_paid_ticket(&self, ticket: Ticket, payment: Payment) -> StoreResult<(Ticket, Payment)> {
        // dropping `tx` on any early return rolls every write back
        let mut tx = self.pool.begin().await?;
        reserve(&mut tx, ticket.event_id, ticket.quantity).await?;
        let created_ticket = db::ticket::create(&ticket, &mut *tx).await?;
        let created_payment = db::payment::create(&payment, &mut *tx).await?;
        tx.commit().await?;
        debug!(
            "ticket {} and payment {} committed",
            created_ticket.ticket_number, created_payment.transaction_id
        );
        Ok((created_ticket, created_payment))
    }

    async fn check_in(&self, ticket_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let changed = db::ticket::mark_checked_in(ticket_id, at, &self.pool).await?;
        Ok(changed == 1)
    }

    async fn find_payment_by_transaction(&self, transaction_id: &str) -> StoreResult<Option<Payment>> {
        Ok(db::payment::get_by_transaction_id(transaction_id, &self.pool).await?)
    }

    async fn list_payments_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Payment>> {
        Ok(db::payment::get_all_for_user(user_id, &self.pool).await?)
    }
}

async fn reserve(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    event_id: Uuid,
    quantity: i32,
) -> StoreResult<()> {
    if db::event::add_sold(event_id, quantity, &mut **tx).await? {
        return Ok(());
    }
    if db::event::exists(event_id, &mut **tx).await? {
        Err(StoreError::SoldOut)
    } else {
        Err(StoreError::NotFound)
    }
}
