//! Fixtures and a scripted payment gateway shared by unit and HTTP tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    gateway::{GatewayError, PaymentGateway, VerifiedTransaction},
    models::{
        Event, EventStatus, Payment, Pricing, Role, Schedule, Ticket, TicketAvailability,
        TicketType, User, DEFAULT_CURRENCY,
    },
    service::{crypto, payment, ticket},
    store::{Store, StoreResult},
};

pub fn user(role: Role) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        name: format!("{role} {}", &id.simple().to_string()[..6]),
        email: format!("{}@example.com", id.simple()),
        pwd_hash: crypto::hash_password("password123"),
        role,
        organization_name: (role == Role::Organizer).then(|| "Eventure Live".to_string()),
        created_at: Utc::now(),
    }
}

pub fn organizer() -> User {
    user(Role::Organizer)
}

pub fn attendee() -> User {
    user(Role::Attendee)
}

/// A published event priced at `price` whole currency units, no capacity limit.
pub fn paid_event(organizer_id: Uuid, price: i64) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        title: "Afrobeats Live".to_string(),
        description: Some("An evening of live music".to_string()),
        category: "Music".to_string(),
        schedule: Schedule {
            start_date: now + Duration::days(14),
            end_date: now + Duration::days(14) + Duration::hours(4),
            timezone: Some("Africa/Lagos".to_string()),
        },
        price: Pricing {
            amount: Decimal::new(price, 0),
            currency: DEFAULT_CURRENCY.to_string(),
            early_bird_price: None,
            early_bird_end_date: None,
            vip_price: None,
        },
        available_tickets: TicketAvailability::default(),
        status: EventStatus::Published,
        organizer_id,
        created_at: now,
        updated_at: now,
    }
}

pub fn free_event(organizer_id: Uuid) -> Event {
    paid_event(organizer_id, 0)
}

pub fn free_ticket(event: &Event, user_id: Uuid) -> Ticket {
    ticket::build_free_ticket(event, user_id, Utc::now())
}

pub fn paid_ticket(event: &Event, user_id: Uuid, reference: &str, amount_minor: i64) -> (Ticket, Payment) {
    let tx = VerifiedTransaction {
        reference: reference.to_string(),
        amount_minor,
        currency: event.price.currency.clone(),
    };
    payment::build_paid_records(event.id, user_id, TicketType::Regular, 1, &tx, Utc::now())
}

/// Answers `verify` from a fixed table of references. Unknown references
/// behave like Paystack's "Transaction reference not found".
#[derive(Default)]
pub struct StubGateway {
    outcomes: Mutex<HashMap<String, Result<VerifiedTransaction, GatewayError>>>,
    calls: AtomicUsize,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_success(self, reference: &str, amount_minor: i64, currency: &str) -> Self {
        self.insert(
            reference,
            Ok(VerifiedTransaction {
                reference: reference.to_string(),
                amount_minor,
                currency: currency.to_string(),
            }),
        );
        self
    }

    pub fn with_failure(self, reference: &str, err: GatewayError) -> Self {
        self.insert(reference, Err(err));
        self
    }

    fn insert(&self, reference: &str, outcome: Result<VerifiedTransaction, GatewayError>) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.insert(reference.to_string(), outcome);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcomes = self
            .outcomes
            .lock()
            .map_err(|_| GatewayError::Transport("stub lock poisoned".to_string()))?;
        outcomes.get(reference).cloned().unwrap_or_else(|| {
            Err(GatewayError::NotSuccessful(
                "Transaction reference not found".to_string(),
            ))
        })
    }
}

/// Wraps a store so the first payment lookup by transaction and the first
/// ticket lookup by event and user come back empty, the way they do for a
/// request racing another one that commits in between. Later lookups and all
/// writes go straight to the inner store.
pub struct RacingStore<S> {
    inner: S,
    payment_seen: AtomicBool,
    ticket_seen: AtomicBool,
}

impl<S: Store> RacingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            payment_seen: AtomicBool::new(false),
            ticket_seen: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for RacingStore<S> {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        self.inner.create_user(user).await
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        self.inner.create_event(event).await
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        self.inner.find_event(id).await
    }

    async fn update_event(&self, event: Event) -> StoreResult<Event> {
        self.inner.update_event(event).await
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        self.inner.list_events().await
    }

    async fn find_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        self.inner.find_ticket(id).await
    }

    async fn find_ticket_by_code(&self, code: &str) -> StoreResult<Option<Ticket>> {
        self.inner.find_ticket_by_code(code).await
    }

    async fn find_ticket_for_user(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Ticket>> {
        if !self.ticket_seen.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_ticket_for_user(event_id, user_id).await
    }

    async fn list_tickets_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Ticket>> {
        self.inner.list_tickets_for_user(user_id).await
    }

    async fn issue_ticket(&self, ticket: Ticket) -> StoreResult<Ticket> {
        self.inner.issue_ticket(ticket).await
    }

    async fn issue_paid_ticket(&self, ticket: Ticket, payment: Payment) -> StoreResult<(Ticket, Payment)> {
        self.inner.issue_paid_ticket(ticket, payment).await
    }

    async fn check_in(&self, ticket_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        self.inner.check_in(ticket_id, at).await
    }

    async fn find_payment_by_transaction(&self, transaction_id: &str) -> StoreResult<Option<Payment>> {
        if !self.payment_seen.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_payment_by_transaction(transaction_id).await
    }

    async fn list_payments_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Payment>> {
        self.inner.list_payments_for_user(user_id).await
    }
}
