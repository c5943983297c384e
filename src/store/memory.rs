use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    Store, StoreError, StoreResult, PAYMENTS_TRANSACTION_KEY, TICKETS_CODE_KEY,
    TICKETS_FREE_EVENT_USER_KEY, TICKETS_NUMBER_KEY, USERS_EMAIL_KEY,
};
use crate::models::{Event, Payment, Ticket, User};

/// Process-local store with the same uniqueness and capacity rules as the
/// Postgres schema. Every write happens under one lock, which stands in for
/// a transaction.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    // insertion order doubles as creation order
    tickets: Vec<Ticket>,
    payments: Vec<Payment>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }
}

impl State {
    fn check_ticket_unique(&self, ticket: &Ticket) -> StoreResult<()> {
        for existing in &self.tickets {
            if existing.ticket_number == ticket.ticket_number {
                return Err(StoreError::Conflict(TICKETS_NUMBER_KEY.to_string()));
            }
            if existing.ticket_code == ticket.ticket_code {
                return Err(StoreError::Conflict(TICKETS_CODE_KEY.to_string()));
            }
            let both_free = existing.payment_id.is_none() && ticket.payment_id.is_none();
            if both_free && existing.event_id == ticket.event_id && existing.user_id == ticket.user_id {
                return Err(StoreError::Conflict(TICKETS_FREE_EVENT_USER_KEY.to_string()));
            }
        }
        Ok(())
    }

    fn check_payment_unique(&self, payment: &Payment) -> StoreResult<()> {
        if self
            .payments
            .iter()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(StoreError::Conflict(PAYMENTS_TRANSACTION_KEY.to_string()));
        }
        Ok(())
    }

    fn check_capacity(&self, event_id: Uuid, quantity: i32) -> StoreResult<()> {
        let event = self.events.get(&event_id).ok_or(StoreError::NotFound)?;
        let counted = event.available_tickets.sold.checked_add(quantity).is_some();
        if counted && event.available_tickets.can_issue(quantity) {
            Ok(())
        } else {
            Err(StoreError::SoldOut)
        }
    }

    fn add_sold(&mut self, event_id: Uuid, quantity: i32) {
        if let Some(event) = self.events.get_mut(&event_id) {
            event.available_tickets.sold += quantity;
            event.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut state = self.lock()?;
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Conflict(USERS_EMAIL_KEY.to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        self.lock()?.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.lock()?.events.get(&id).cloned())
    }

    async fn update_event(&self, event: Event) -> StoreResult<Event> {
        let mut state = self.lock()?;
        let stored = state.events.get_mut(&event.id).ok_or(StoreError::NotFound)?;
        let issued = stored.available_tickets.sold + stored.available_tickets.reserved;
        if matches!(event.available_tickets.total, Some(total) if total < issued) {
            return Err(StoreError::SoldOut);
        }
        stored.title = event.title;
        stored.description = event.description;
        stored.category = event.category;
        stored.schedule = event.schedule;
        stored.price = event.price;
        stored.available_tickets.total = event.available_tickets.total;
        stored.status = event.status;
        stored.updated_at = event.updated_at;
        Ok(stored.clone())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = self.lock()?.events.values().cloned().collect();
        events.sort_by_key(|e| e.schedule.start_date);
        Ok(events)
    }

    async fn find_ticket(&self, id: Uuid) -> StoreResult<Option<Ticket>> {
        Ok(self.lock()?.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn find_ticket_by_code(&self, code: &str) -> StoreResult<Option<Ticket>> {
        Ok(self
            .lock()?
            .tickets
            .iter()
            .find(|t| t.ticket_code == code)
            .cloned())
    }

    async fn find_ticket_for_user(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Ticket>> {
        Ok(self
            .lock()?
            .tickets
            .iter()
            .find(|t| t.event_id == event_id && t.user_id == user_id)
            .cloned())
    }

    async fn list_tickets_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Ticket>> {
        Ok(self
            .lock()?
            .tickets
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn issue_ticket(&self, ticket: Ticket) -> StoreResult<Ticket> {
        let mut state = self.lock()?;
        state.check_capacity(ticket.event_id, ticket.quantity)?;
        state.check_ticket_unique(&ticket)?;
        state.add_sold(ticket.event_id, ticket.quantity);
        state.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn issue_paid_ticket(&self, ticket: Ticket, payment: Payment) -> StoreResult<(Ticket, Payment)> {
        let mut state = self.lock()?;
        state.check_capacity(ticket.event_id, ticket.quantity)?;
        state.check_ticket_unique(&ticket)?;
        state.check_payment_unique(&payment)?;
        state.add_sold(ticket.event_id, ticket.quantity);
        state.tickets.push(ticket.clone());
        state.payments.push(payment.clone());
        Ok((ticket, payment))
    }

    async fn check_in(&self, ticket_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut state = self.lock()?;
        let ticket = state
            .tickets
            .iter_mut()
            .find(|t| t.id == ticket_id)
            .ok_or(StoreError::NotFound)?;
        if ticket.checked_in {
            return Ok(false);
        }
        ticket.checked_in = true;
        ticket.check_in_time = Some(at);
        ticket.updated_at = at;
        Ok(true)
    }

    async fn find_payment_by_transaction(&self, transaction_id: &str) -> StoreResult<Option<Payment>> {
        Ok(self
            .lock()?
            .payments
            .iter()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    async fn list_payments_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Payment>> {
        Ok(self
            .lock()?
            .payments
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[actix_rt::test]
    async fn second_free_ticket_for_same_pair_is_rejected() {
        let store = MemoryStore::new();
        let organizer = testing::organizer();
        let attendee = testing::attendee();
        let event = store.create_event(testing::free_event(organizer.id)).await.unwrap();

        store
            .issue_ticket(testing::free_ticket(&event, attendee.id))
            .await
            .unwrap();
        let err = store
            .issue_ticket(testing::free_ticket(&event, attendee.id))
            .await
            .unwrap_err();

        assert!(err.is_conflict_on(TICKETS_FREE_EVENT_USER_KEY));
        assert_eq!(store.find_event(event.id).await.unwrap().unwrap().available_tickets.sold, 1);
    }

    #[actix_rt::test]
    async fn capacity_is_enforced_without_partial_writes() {
        let store = MemoryStore::new();
        let mut event = testing::free_event(Uuid::new_v4());
        event.available_tickets.total = Some(1);
        let event = store.create_event(event).await.unwrap();

        store.issue_ticket(testing::free_ticket(&event, Uuid::new_v4())).await.unwrap();
        let err = store
            .issue_ticket(testing::free_ticket(&event, Uuid::new_v4()))
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::SoldOut);
        assert_eq!(store.lock().unwrap().tickets.len(), 1);
    }

    #[actix_rt::test]
    async fn sold_counter_never_overflows() {
        let store = MemoryStore::new();
        let event = store
            .create_event(testing::paid_event(Uuid::new_v4(), 1))
            .await
            .unwrap();
        let (mut ticket, payment) = testing::paid_ticket(&event, Uuid::new_v4(), "ref_big", 100);
        ticket.quantity = i32::MAX;
        store.issue_paid_ticket(ticket, payment).await.unwrap();

        let (ticket, payment) = testing::paid_ticket(&event, Uuid::new_v4(), "ref_more", 100);
        let err = store.issue_paid_ticket(ticket, payment).await.unwrap_err();
        assert_eq!(err, StoreError::SoldOut);
        assert_eq!(store.find_event(event.id).await.unwrap().unwrap().available_tickets.sold, i32::MAX);
    }

    #[actix_rt::test]
    async fn replayed_transaction_id_writes_nothing() {
        let store = MemoryStore::new();
        let event = store
            .create_event(testing::paid_event(Uuid::new_v4(), 5_000))
            .await
            .unwrap();
        let buyer = Uuid::new_v4();

        let (ticket, payment) = testing::paid_ticket(&event, buyer, "ref_1", 500_000);
        store.issue_paid_ticket(ticket, payment).await.unwrap();
        let (ticket, payment) = testing::paid_ticket(&event, buyer, "ref_1", 500_000);
        let err = store.issue_paid_ticket(ticket, payment).await.unwrap_err();

        assert!(err.is_conflict_on(PAYMENTS_TRANSACTION_KEY));
        let state = store.lock().unwrap();
        assert_eq!(state.tickets.len(), 1);
        assert_eq!(state.payments.len(), 1);
        assert_eq!(state.events[&event.id].available_tickets.sold, 1);
    }

    #[actix_rt::test]
    async fn event_update_keeps_counters_and_respects_issued_tickets() {
        let store = MemoryStore::new();
        let event = store.create_event(testing::free_event(Uuid::new_v4())).await.unwrap();
        store.issue_ticket(testing::free_ticket(&event, Uuid::new_v4())).await.unwrap();
        store.issue_ticket(testing::free_ticket(&event, Uuid::new_v4())).await.unwrap();

        let mut edited = event.clone();
        edited.title = "Renamed".to_string();
        edited.available_tickets.sold = 0;
        edited.available_tickets.total = Some(2);
        let updated = store.update_event(edited.clone()).await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.available_tickets.sold, 2);

        edited.available_tickets.total = Some(1);
        assert_eq!(store.update_event(edited).await.unwrap_err(), StoreError::SoldOut);

        let unknown = testing::free_event(Uuid::new_v4());
        assert_eq!(store.update_event(unknown).await.unwrap_err(), StoreError::NotFound);
    }

    #[actix_rt::test]
    async fn check_in_transitions_once() {
        let store = MemoryStore::new();
        let event = store.create_event(testing::free_event(Uuid::new_v4())).await.unwrap();
        let ticket = store
            .issue_ticket(testing::free_ticket(&event, Uuid::new_v4()))
            .await
            .unwrap();

        let first = Utc::now();
        assert!(store.check_in(ticket.id, first).await.unwrap());
        assert!(!store.check_in(ticket.id, Utc::now()).await.unwrap());

        let stored = store.find_ticket(ticket.id).await.unwrap().unwrap();
        assert!(stored.checked_in);
        assert_eq!(stored.check_in_time, Some(first));
    }

    #[actix_rt::test]
    async fn duplicate_email_is_a_conflict_regardless_of_case() {
        let store = MemoryStore::new();
        let mut user = testing::attendee();
        user.email = "Ada@Example.com".to_string();
        store.create_user(user).await.unwrap();

        let mut twin = testing::attendee();
        twin.email = "ada@example.com".to_string();
        let err = store.create_user(twin).await.unwrap_err();
        assert!(err.is_conflict_on(USERS_EMAIL_KEY));
    }
}
