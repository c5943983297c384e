use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::{
   dto::{NewEventDto, NewPricingDto, NewScheduleDto, UpdateEventDto},
   errors::ApiError,
   models::{Event, EventStatus, Pricing, Role, Schedule, TicketAvailability, DEFAULT_CURRENCY},
   service::{
      auth::{Permissions, UserAuthData},
      storage_error,
   },
   store::{Store, StoreError},
};

const NOT_ORGANIZER: &str = "You are not the organizer for this event";

fn schedule(dto: NewScheduleDto) -> Schedule {
   Schedule {
      start_date: dto.start_date,
      end_date: dto.end_date,
      timezone: dto.timezone,
   }
}

fn pricing(dto: NewPricingDto) -> Pricing {
   Pricing {
      amount: dto.amount,
      currency: dto
         .currency
         .map(|c| c.trim().to_uppercase())
         .filter(|c| !c.is_empty())
         .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
      early_bird_price: dto.early_bird_price,
      early_bird_end_date: dto.early_bird_end_date,
      vip_price: dto.vip_price,
   }
}

fn check_fields(event: &Event) -> Result<(), ApiError> {
   if event.title.is_empty() {
      return Err(ApiError::bad_request("Title is required"));
   }
   if event.category.is_empty() {
      return Err(ApiError::bad_request("Category is required"));
   }
   if event.schedule.end_date < event.schedule.start_date {
      return Err(ApiError::bad_request("End date must not be before start date"));
   }
   let prices = [Some(event.price.amount), event.price.early_bird_price, event.price.vip_price];
   if prices.iter().flatten().any(|p| p.is_sign_negative()) {
      return Err(ApiError::bad_request("Prices must not be negative"));
   }
   if matches!(event.available_tickets.total, Some(total) if total < 0) {
      return Err(ApiError::bad_request("Total tickets must not be negative"));
   }
   Ok(())
}

/// Loads an event the caller may change: its organizer, or an admin.
async fn editable(id: Uuid, user_auth_data: &UserAuthData, store: &dyn Store) -> Result<Event, ApiError> {
   user_auth_data.require(Permissions::MANAGE_EVENTS, "Only organizers can manage events")?;
   let event = get_by_id(id, store).await?;
   if event.organizer_id != user_auth_data.user_id && user_auth_data.role != Role::Admin {
      return Err(ApiError::forbidden(NOT_ORGANIZER));
   }
   Ok(event)
}

async fn save(event: Event, store: &dyn Store) -> Result<Event, ApiError> {
   match store.update_event(event).await {
      Ok(event) => Ok(event),
      Err(StoreError::NotFound) => Err(ApiError::not_found("Event not found")),
      Err(StoreError::SoldOut) => Err(ApiError::bad_request("Total tickets cannot be below tickets already issued")),
      Err(err) => Err(storage_error(err)),
   }
}

pub async fn create(user_auth_data: &UserAuthData, dto: NewEventDto, store: &dyn Store) -> Result<Event, ApiError> {
   user_auth_data.require(Permissions::MANAGE_EVENTS, "Only organizers can create events")?;

   let now = Utc::now();
   let event = Event {
      id: Uuid::new_v4(),
      title: dto.title.trim().to_string(),
      description: dto.description,
      category: dto.category.trim().to_string(),
      schedule: schedule(dto.date),
      price: pricing(dto.price),
      available_tickets: TicketAvailability {
         total: dto.available_tickets.total,
         sold: 0,
         reserved: 0,
      },
      status: dto.status.unwrap_or(EventStatus::Draft),
      organizer_id: user_auth_data.user_id,
      created_at: now,
      updated_at: now,
   };
   check_fields(&event)?;
   let event = store.create_event(event).await.map_err(storage_error)?;
   info!("event {} created by {}", event.id, event.organizer_id);
   Ok(event)
}

pub async fn update(
   user_auth_data: &UserAuthData,
   id: Uuid,
   dto: UpdateEventDto,
   store: &dyn Store,
) -> Result<Event, ApiError> {
   let mut event = editable(id, user_auth_data, store).await?;

   if let Some(title) = dto.title {
      event.title = title.trim().to_string();
   }
   if dto.description.is_some() {
      event.description = dto.description;
   }
   if let Some(category) = dto.category {
      event.category = category.trim().to_string();
   }
   if let Some(date) = dto.date {
      event.schedule = schedule(date);
   }
   if let Some(price) = dto.price {
      event.price = pricing(price);
   }
   if let Some(available) = dto.available_tickets {
      event.available_tickets.total = available.total;
   }
   if let Some(status) = dto.status {
      event.status = status;
   }
   event.updated_at = Utc::now();
   check_fields(&event)?;

   let event = save(event, store).await?;
   info!("event {} updated by {}", event.id, user_auth_data.user_id);
   Ok(event)
}

/// Events are never removed since tickets point at them; deleting one
/// cancels it, which stops further issuance.
pub async fn cancel(user_auth_data: &UserAuthData, id: Uuid, store: &dyn Store) -> Result<Event, ApiError> {
   let mut event = editable(id, user_auth_data, store).await?;
   if event.status == EventStatus::Cancelled {
      return Ok(event);
   }
   event.status = EventStatus::Cancelled;
   event.updated_at = Utc::now();
   let event = save(event, store).await?;
   info!("event {} cancelled by {}", event.id, user_auth_data.user_id);
   Ok(event)
}

pub async fn get_all(store: &dyn Store) -> Result<Vec<Event>, ApiError> {
   store.list_events().await.map_err(storage_error)
}

pub async fn get_by_id(id: Uuid, store: &dyn Store) -> Result<Event, ApiError> {
   store
      .find_event(id)
      .await
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::not_found("Event not found"))
}
