use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Event, EventStatus, Payment, Role, Ticket, TicketDetails, TicketType, User};

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewUserDto {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub role: Option<Role>,
    pub organization_name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthUserResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn new(user: &User, exp: usize) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            exp,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduleDto {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewPricingDto {
    pub amount: Decimal,
    pub currency: Option<String>,
    pub early_bird_price: Option<Decimal>,
    pub early_bird_end_date: Option<DateTime<Utc>>,
    pub vip_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NewAvailabilityDto {
    pub total: Option<i32>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewEventDto {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub date: NewScheduleDto,
    pub price: NewPricingDto,
    #[serde(default)]
    pub available_tickets: NewAvailabilityDto,
    pub status: Option<EventStatus>,
}

/// Fields left out keep their current value.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<NewScheduleDto>,
    pub price: Option<NewPricingDto>,
    pub available_tickets: Option<NewAvailabilityDto>,
    pub status: Option<EventStatus>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FreeTicketRequest {
    pub event_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub reference: Option<String>,
    pub event_id: Option<Uuid>,
    #[serde(default)]
    pub ticket_type: TicketType,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTicketRequest {
    pub code: Option<String>,
    pub event_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub success: bool,
    pub ticket: Ticket,
}

#[derive(Debug, Serialize)]
pub struct PaidTicketResponse {
    pub success: bool,
    pub ticket: Ticket,
    pub payment: Payment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub success: bool,
    pub ticket: TicketDetails,
    pub was_checked_in: bool,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub success: bool,
    pub event: Event,
}
