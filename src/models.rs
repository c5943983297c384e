use chrono::{DateTime, Utc};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, prelude::FromRow, types::Json, Row};
use uuid::Uuid;

pub const DEFAULT_CURRENCY: &str = "NGN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Role {
    #[display(fmt = "attendee")]
    Attendee,
    #[display(fmt = "organizer")]
    Organizer,
    #[display(fmt = "admin")]
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum EventStatus {
    #[display(fmt = "draft")]
    Draft,
    #[display(fmt = "published")]
    Published,
    #[display(fmt = "cancelled")]
    Cancelled,
    #[display(fmt = "completed")]
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum TicketType {
    #[default]
    #[display(fmt = "regular")]
    Regular,
    #[display(fmt = "vip")]
    Vip,
    #[display(fmt = "early-bird")]
    #[serde(rename = "early-bird")]
    #[sqlx(rename = "early-bird")]
    EarlyBird,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum TicketStatus {
    #[display(fmt = "pending")]
    Pending,
    #[display(fmt = "confirmed")]
    Confirmed,
    #[display(fmt = "cancelled")]
    Cancelled,
    #[display(fmt = "refunded")]
    Refunded,
    #[display(fmt = "used")]
    Used,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PaymentMethod {
    #[display(fmt = "credit_card")]
    CreditCard,
    #[display(fmt = "debit_card")]
    DebitCard,
    #[display(fmt = "paypal")]
    Paypal,
    #[display(fmt = "bank_transfer")]
    BankTransfer,
    #[display(fmt = "other")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PaymentStatus {
    #[display(fmt = "pending")]
    Pending,
    #[display(fmt = "processing")]
    Processing,
    #[display(fmt = "completed")]
    Completed,
    #[display(fmt = "failed")]
    Failed,
    #[display(fmt = "refunded")]
    Refunded,
    #[display(fmt = "partially_refunded")]
    PartiallyRefunded,
    #[display(fmt = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum GatewayName {
    #[display(fmt = "paystack")]
    Paystack,
    #[display(fmt = "stripe")]
    Stripe,
    #[display(fmt = "paypal")]
    Paypal,
    #[display(fmt = "square")]
    Square,
    #[display(fmt = "other")]
    Other,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub pwd_hash: String,
    pub role: Role,
    pub organization_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Converts an amount in minor units (kobo, cents) into major units.
    pub fn from_minor(amount_minor: i64, currency: impl Into<String>) -> Self {
        Self::new(Decimal::new(amount_minor, 2), currency)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub amount: Decimal,
    pub currency: String,
    pub early_bird_price: Option<Decimal>,
    pub early_bird_end_date: Option<DateTime<Utc>>,
    pub vip_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketAvailability {
    pub total: Option<i32>,
    pub sold: i32,
    pub reserved: i32,
}

impl TicketAvailability {
    /// `None` means the event has no capacity limit.
    pub fn remaining(&self) -> Option<i32> {
        self.total
            .map(|total| (total - self.sold - self.reserved).max(0))
    }

    pub fn can_issue(&self, quantity: i32) -> bool {
        self.remaining().map_or(true, |left| left >= quantity)
    }
}

#[derive(Debug, Clone, Display, PartialEq, Eq)]
pub enum PricingError {
    #[display(fmt = "VIP tickets are not offered for this event")]
    VipUnavailable,
    #[display(fmt = "Early-bird tickets are not offered for this event")]
    EarlyBirdUnavailable,
    #[display(fmt = "Early-bird sales have ended")]
    EarlyBirdEnded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(rename = "date")]
    pub schedule: Schedule,
    pub price: Pricing,
    pub available_tickets: TicketAvailability,
    pub status: EventStatus,
    #[serde(rename = "organizer")]
    pub organizer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_free(&self) -> bool {
        self.price.amount.is_zero()
    }

    /// Unit price of `ticket_type` at instant `now`.
    pub fn tier_price(
        &self,
        ticket_type: TicketType,
        now: DateTime<Utc>,
    ) -> Result<Decimal, PricingError> {
        match ticket_type {
            TicketType::Regular => Ok(self.price.amount),
            TicketType::Vip => self.price.vip_price.ok_or(PricingError::VipUnavailable),
            TicketType::EarlyBird => {
                let price = self
                    .price
                    .early_bird_price
                    .ok_or(PricingError::EarlyBirdUnavailable)?;
                match self.price.early_bird_end_date {
                    Some(end) if now > end => Err(PricingError::EarlyBirdEnded),
                    _ => Ok(price),
                }
            }
        }
    }
}

impl<'r> FromRow<'r, PgRow> for Event {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Event {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            schedule: Schedule {
                start_date: row.try_get("start_date")?,
                end_date: row.try_get("end_date")?,
                timezone: row.try_get("timezone")?,
            },
            price: Pricing {
                amount: row.try_get("price_amount")?,
                currency: row.try_get("currency")?,
                early_bird_price: row.try_get("early_bird_price")?,
                early_bird_end_date: row.try_get("early_bird_end_date")?,
                vip_price: row.try_get("vip_price")?,
            },
            available_tickets: TicketAvailability {
                total: row.try_get("total_tickets")?,
                sold: row.try_get("sold_tickets")?,
                reserved: row.try_get("reserved_tickets")?,
            },
            status: row.try_get("status")?,
            organizer_id: row.try_get("organizer_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "event")]
    pub event_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub ticket_type: TicketType,
    pub ticket_number: String,
    pub ticket_code: String,
    pub quantity: i32,
    pub price: Money,
    pub total_price: Money,
    pub status: TicketStatus,
    pub checked_in: bool,
    pub check_in_time: Option<DateTime<Utc>>,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Ticket {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let currency: String = row.try_get("currency")?;
        Ok(Ticket {
            id: row.try_get("id")?,
            event_id: row.try_get("event_id")?,
            user_id: row.try_get("user_id")?,
            ticket_type: row.try_get("ticket_type")?,
            ticket_number: row.try_get("ticket_number")?,
            ticket_code: row.try_get("ticket_code")?,
            quantity: row.try_get("quantity")?,
            price: Money::new(row.try_get("price_amount")?, currency.clone()),
            total_price: Money::new(row.try_get("total_amount")?, currency),
            status: row.try_get("status")?,
            checked_in: row.try_get("checked_in")?,
            check_in_time: row.try_get("check_in_time")?,
            payment_method: row.try_get("payment_method")?,
            payment_id: row.try_get("payment_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A ticket with its event and holder resolved, as returned by check-in.
/// Serializes as the ticket with `event` and `user` holding the full records
/// instead of their ids.
#[derive(Debug, Clone)]
pub struct TicketDetails {
    pub ticket: Ticket,
    pub event: Event,
    pub user: User,
}

impl Serialize for TicketDetails {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;

        let mut value = serde_json::to_value(&self.ticket).map_err(S::Error::custom)?;
        if let Some(fields) = value.as_object_mut() {
            fields.insert("event".to_string(), serde_json::to_value(&self.event).map_err(S::Error::custom)?);
            fields.insert("user".to_string(), serde_json::to_value(&self.user).map_err(S::Error::custom)?);
        }
        value.serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayInfo {
    pub name: GatewayName,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentHistoryEntry {
    pub status: PaymentStatus,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    #[serde(rename = "ticket")]
    pub ticket_id: Uuid,
    #[serde(rename = "event")]
    pub event_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub transaction_id: String,
    pub gateway: GatewayInfo,
    pub history: Vec<PaymentHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Payment {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let history: Json<Vec<PaymentHistoryEntry>> = row.try_get("history")?;
        Ok(Payment {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            ticket_id: row.try_get("ticket_id")?,
            event_id: row.try_get("event_id")?,
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            status: row.try_get("status")?,
            payment_method: row.try_get("payment_method")?,
            transaction_id: row.try_get("transaction_id")?,
            gateway: GatewayInfo {
                name: row.try_get("gateway_name")?,
                transaction_id: row.try_get("gateway_transaction_id")?,
            },
            history: history.0,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
