//! Persistence seam between the services and the database.
//!
//! Multi-row writes (ticket + sold counter, ticket + payment + sold counter)
//! are single `Store` calls so that each implementation can run them as one
//! unit: a transaction in Postgres, a single critical section in memory.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Display;
use uuid::Uuid;

use crate::models::{Event, Payment, Ticket, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const TICKETS_NUMBER_KEY: &str = "tickets_ticket_number_key";
pub const TICKETS_CODE_KEY: &str = "tickets_ticket_code_key";
pub const TICKETS_FREE_EVENT_USER_KEY: &str = "tickets_free_event_user_key";
pub const PAYMENTS_TRANSACTION_KEY: &str = "payments_transaction_id_key";

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[display(fmt = "record not found")]
    NotFound,

    /// The event cannot take the requested number of tickets.
    #[display(fmt = "not enough tickets available")]
    SoldOut,

    /// A uniqueness constraint rejected the write; carries the constraint name.
    #[display(fmt = "unique constraint '{}' violated", _0)]
    Conflict(String),

    #[display(fmt = "database error: {}", _0)]
    Database(String),
}

impl std::error::Error for StoreError {}

impl StoreError {
    pub fn is_conflict_on(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Conflict(name) if name == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.constraint().unwrap_or_default().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: User) -> StoreResult<User>;
    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn create_event(&self, event: Event) -> StoreResult<Event>;
    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>>;
    /// Overwrites the organizer-editable fields of a stored event, keeping its
    /// sold and reserved counters. `SoldOut` when the new capacity is below
    /// what has already been issued.
    async fn update_event(&self, event: Event) -> StoreResult<Event>;
    /// Soonest first.
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    async fn find_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>>;
    async fn find_ticket_by_code(&self, code: &str) -> StoreResult<Option<Ticket>>;
    async fn find_ticket_for_user(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Ticket>>;
    /// Newest first.
    async fn list_tickets_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Ticket>>;

    /// Adds `ticket.quantity` to the event's sold counter and inserts the
    /// ticket, or does neither.
    async fn issue_ticket(&self, ticket: Ticket) -> StoreResult<Ticket>;

    /// Like [`Store::issue_ticket`] and additionally inserts the payment that
    /// paid for the ticket, all or nothing.
    async fn issue_paid_ticket(&self, ticket: Ticket, payment: Payment) -> StoreResult<(Ticket, Payment)>;

    /// Flips `checked_in` to true if it is still false. Returns `true` when
    /// this call made the transition, `false` when the ticket was already
    /// checked in.
    async fn check_in(&self, ticket_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool>;

    async fn find_payment_by_transaction(&self, transaction_id: &str) -> StoreResult<Option<Payment>>;
    /// Newest first.
    async fn list_payments_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Payment>>;
}
