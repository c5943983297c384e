use chrono::{DateTime, Utc};
use log::{info, warn};
use uuid::Uuid;

use crate::{
   dto::{FreeTicketRequest, ValidateTicketRequest},
   errors::ApiError,
   models::{
      Event, EventStatus, Money, PaymentMethod, Ticket, TicketDetails, TicketStatus, TicketType,
   },
   service::{
      auth::{Permissions, UserAuthData},
      crypto, storage_error,
   },
   store::{Store, StoreError, TICKETS_FREE_EVENT_USER_KEY},
};

pub const DUPLICATE_TICKET: &str = "You already have a ticket for this event";
pub const NOT_ENOUGH_TICKETS: &str = "Not enough tickets available";

/// A confirmed single admission to a free event, not yet stored.
pub fn build_free_ticket(event: &Event, user_id: Uuid, now: DateTime<Utc>) -> Ticket {
   let currency = event.price.currency.clone();
   Ticket {
      id: Uuid::new_v4(),
      event_id: event.id,
      user_id,
      ticket_type: TicketType::Regular,
      ticket_number: crypto::new_ticket_number(),
      ticket_code: crypto::new_ticket_code(),
      quantity: 1,
      price: Money::zero(currency.clone()),
      total_price: Money::zero(currency),
      status: TicketStatus::Confirmed,
      checked_in: false,
      check_in_time: None,
      payment_method: PaymentMethod::Other,
      payment_id: None,
      created_at: now,
      updated_at: now,
   }
}

/// Loads the event a ticket is requested for and rejects events that can no
/// longer take `quantity` more tickets.
pub(crate) async fn issuable_event(event_id: Uuid, quantity: i32, store: &dyn Store) -> Result<Event, ApiError> {
   let event = store
      .find_event(event_id)
      .await
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::not_found("Event not found"))?;
   if event.status == EventStatus::Cancelled {
      return Err(ApiError::bad_request("Event has been cancelled"));
   }
   if !event.available_tickets.can_issue(quantity) {
      return Err(ApiError::bad_request(NOT_ENOUGH_TICKETS));
   }
   Ok(event)
}

pub async fn issue_free(req: FreeTicketRequest, user_auth_data: &UserAuthData, store: &dyn Store) -> Result<Ticket, ApiError> {
   let event_id = req.event_id.ok_or_else(|| ApiError::bad_request("Event ID is required"))?;
   let user_id = user_auth_data.user_id;

   let event = store
      .find_event(event_id)
      .await
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::not_found("Event not found"))?;
   if event.status == EventStatus::Cancelled {
      return Err(ApiError::bad_request("Event has been cancelled"));
   }
   if !event.is_free() {
      return Err(ApiError::bad_request("Event is not free"));
   }
   let existing = store
      .find_ticket_for_user(event_id, user_id)
      .await
      .map_err(storage_error)?;
   if existing.is_some() {
      return Err(ApiError::bad_request(DUPLICATE_TICKET));
   }
   if !event.available_tickets.can_issue(1) {
      return Err(ApiError::bad_request(NOT_ENOUGH_TICKETS));
   }

   match store.issue_ticket(build_free_ticket(&event, user_id, Utc::now())).await {
      Ok(ticket) => {
         info!("free ticket {} issued to {} for event {}", ticket.ticket_number, user_id, event_id);
         Ok(ticket)
      }
      // lost a race with a concurrent request for the same pair
      Err(err) if err.is_conflict_on(TICKETS_FREE_EVENT_USER_KEY) => {
         warn!("duplicate free ticket for {} on event {}", user_id, event_id);
         Err(ApiError::bad_request(DUPLICATE_TICKET))
      }
      Err(StoreError::SoldOut) => Err(ApiError::bad_request(NOT_ENOUGH_TICKETS)),
      Err(StoreError::NotFound) => Err(ApiError::not_found("Event not found")),
      Err(err) => Err(storage_error(err)),
   }
}

/// Scans a check-in code at the door of `event_id`.
///
/// Returns the ticket with its event and holder resolved, and whether the
/// ticket had already been checked in before this call.
pub async fn validate(
   req: ValidateTicketRequest,
   user_auth_data: &UserAuthData,
   store: &dyn Store,
) -> Result<(TicketDetails, bool), ApiError> {
   user_auth_data.require(Permissions::CHECK_IN, "Only organizers can check tickets in")?;

   let code = req
      .code
      .map(|c| c.trim().to_string())
      .filter(|c| !c.is_empty())
      .ok_or_else(|| ApiError::bad_request("Ticket code is required"))?;
   let event_id = req.event_id.ok_or_else(|| ApiError::bad_request("Event ID is required"))?;

   let ticket = store
      .find_ticket_by_code(&code)
      .await
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::not_found("Ticket not found"))?;
   let event = store
      .find_event(ticket.event_id)
      .await
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::not_found("Event not found for this ticket"))?;
   if event.organizer_id != user_auth_data.user_id {
      warn!("{} tried to check in ticket {} for event {}", user_auth_data.user_id, ticket.id, event.id);
      return Err(ApiError::forbidden("You are not the organizer for this event"));
   }
   if ticket.event_id != event_id {
      return Err(ApiError::bad_request("This ticket is not for the selected event"));
   }

   let transitioned = match store.check_in(ticket.id, Utc::now()).await {
      Ok(transitioned) => transitioned,
      Err(StoreError::NotFound) => return Err(ApiError::not_found("Ticket not found")),
      Err(err) => return Err(storage_error(err)),
   };
   let was_checked_in = !transitioned;
   if transitioned {
      info!("ticket {} checked in at event {}", ticket.ticket_number, event.id);
   } else {
      info!("ticket {} scanned again at event {}", ticket.ticket_number, event.id);
   }

   let details = details_for(ticket.id, event, store).await?;
   Ok((details, was_checked_in))
}

pub async fn list_for_user(user_auth_data: &UserAuthData, store: &dyn Store) -> Result<Vec<Ticket>, ApiError> {
   store
      .list_tickets_for_user(user_auth_data.user_id)
      .await
      .map_err(storage_error)
}

/// A ticket is visible to its holder and to the organizer of its event.
pub async fn get_for_caller(id: Uuid, user_auth_data: &UserAuthData, store: &dyn Store) -> Result<TicketDetails, ApiError> {
   let ticket = store
      .find_ticket(id)
      .await
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::not_found("Ticket not found"))?;
   let event = store
      .find_event(ticket.event_id)
      .await
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::not_found("Event not found for this ticket"))?;
   if ticket.user_id != user_auth_data.user_id && event.organizer_id != user_auth_data.user_id {
      return Err(ApiError::forbidden("You do not have access to this ticket"));
   }
   details_for(ticket.id, event, store).await
}

async fn details_for(ticket_id: Uuid, event: Event, store: &dyn Store) -> Result<TicketDetails, ApiError> {
   let ticket = store
      .find_ticket(ticket_id)
      .await
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::not_found("Ticket not found"))?;
   let user = store
      .find_user(ticket.user_id)
      .await
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::not_found("Ticket holder not found"))?;
   Ok(TicketDetails { ticket, event, user })
}
