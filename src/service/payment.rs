use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
   dto::VerifyPaymentRequest,
   errors::ApiError,
   gateway::{PaymentGateway, VerifiedTransaction},
   models::{
      GatewayInfo, GatewayName, Money, Payment, PaymentHistoryEntry, PaymentMethod, PaymentStatus, Ticket,
      TicketStatus, TicketType,
   },
   service::{
      auth::UserAuthData,
      crypto, storage_error,
      ticket::{issuable_event, NOT_ENOUGH_TICKETS},
   },
   store::{Store, StoreError, PAYMENTS_TRANSACTION_KEY},
};

pub const REFERENCE_USED: &str = "Payment reference has already been used";
pub const AMOUNT_MISMATCH: &str = "Paid amount does not cover the requested tickets";
pub const FREE_EVENT: &str = "Event is free, request a free ticket instead";

/// The ticket and payment records for a charge the gateway confirmed.
/// Amount, currency and reference are taken from `tx` as reported.
pub fn build_paid_records(
   event_id: Uuid,
   user_id: Uuid,
   ticket_type: TicketType,
   quantity: i32,
   tx: &VerifiedTransaction,
   now: DateTime<Utc>,
) -> (Ticket, Payment) {
   let paid = Money::from_minor(tx.amount_minor, tx.currency.clone());
   let ticket = Ticket {
      id: Uuid::new_v4(),
      event_id,
      user_id,
      ticket_type,
      ticket_number: crypto::new_ticket_number(),
      ticket_code: crypto::new_ticket_code(),
      quantity,
      price: paid.clone(),
      total_price: paid.clone(),
      status: TicketStatus::Confirmed,
      checked_in: false,
      check_in_time: None,
      payment_method: PaymentMethod::CreditCard,
      payment_id: Some(tx.reference.clone()),
      created_at: now,
      updated_at: now,
   };
   let payment = Payment {
      id: Uuid::new_v4(),
      user_id,
      ticket_id: ticket.id,
      event_id,
      amount: paid.amount,
      currency: paid.currency,
      status: PaymentStatus::Completed,
      payment_method: PaymentMethod::CreditCard,
      transaction_id: tx.reference.clone(),
      gateway: GatewayInfo {
         name: GatewayName::Paystack,
         transaction_id: Some(tx.reference.clone()),
      },
      history: vec![PaymentHistoryEntry {
         status: PaymentStatus::Completed,
         timestamp: now,
         note: Some("Verified with payment gateway".to_string()),
      }],
      created_at: now,
      updated_at: now,
   };
   (ticket, payment)
}

/// Verifies a gateway charge and issues the ticket it paid for.
///
/// Issuance is idempotent on the gateway reference: replaying a reference the
/// caller already redeemed returns the records created the first time.
pub async fn verify_and_issue(
   req: VerifyPaymentRequest,
   user_auth_data: &UserAuthData,
   store: &dyn Store,
   gateway: &dyn PaymentGateway,
) -> Result<(Ticket, Payment), ApiError> {
   let reference = req
      .reference
      .map(|r| r.trim().to_string())
      .filter(|r| !r.is_empty())
      .ok_or_else(|| ApiError::bad_request("Payment reference is required"))?;
   let event_id = req.event_id.ok_or_else(|| ApiError::bad_request("Event ID is required"))?;
   let quantity = req.quantity.unwrap_or(1);
   if quantity < 1 {
      return Err(ApiError::bad_request("Quantity must be at least 1"));
   }

   // replays return what the first redemption created, whatever the event's state now
   if let Some(records) = redeemed(&reference, user_auth_data, store).await? {
      return Ok(records);
   }

   let event = issuable_event(event_id, quantity, store).await?;
   if event.is_free() {
      return Err(ApiError::bad_request(FREE_EVENT));
   }
   let unit_price = event
      .tier_price(req.ticket_type, Utc::now())
      .map_err(|e| ApiError::bad_request(e.to_string()))?;

   let tx = match gateway.verify(&reference).await {
      Ok(tx) => tx,
      Err(err) => {
         warn!("payment {} for event {} not accepted: {}", reference, event_id, err);
         return Err(err.into());
      }
   };

   let due = unit_price * Decimal::from(quantity);
   let paid = Money::from_minor(tx.amount_minor, tx.currency.clone());
   if !paid.currency.eq_ignore_ascii_case(&event.price.currency) || paid.amount < due {
      warn!(
         "payment {} paid {} {} but {} x {} costs {} {}",
         tx.reference, paid.amount, paid.currency, quantity, req.ticket_type, due, event.price.currency
      );
      return Err(ApiError::bad_request(AMOUNT_MISMATCH));
   }

   let (ticket, payment) =
      build_paid_records(event.id, user_auth_data.user_id, req.ticket_type, quantity, &tx, Utc::now());
   match store.issue_paid_ticket(ticket, payment).await {
      Ok((ticket, payment)) => {
         info!(
            "payment {} recorded, ticket {} issued to {} for event {}",
            payment.transaction_id, ticket.ticket_number, ticket.user_id, ticket.event_id
         );
         Ok((ticket, payment))
      }
      // a concurrent request redeemed the same reference first
      Err(err) if err.is_conflict_on(PAYMENTS_TRANSACTION_KEY) => redeemed(&tx.reference, user_auth_data, store)
         .await?
         .ok_or_else(|| ApiError::Conflict(REFERENCE_USED.to_string())),
      Err(StoreError::SoldOut) => {
         error!("payment {} verified but event {} sold out before issuance", tx.reference, event.id);
         Err(ApiError::bad_request(NOT_ENOUGH_TICKETS))
      }
      Err(StoreError::NotFound) => Err(ApiError::not_found("Event not found")),
      Err(err) => Err(storage_error(err)),
   }
}

/// The records already created for `reference`, when the caller owns them.
/// A reference redeemed by someone else is a conflict.
async fn redeemed(
   reference: &str,
   user_auth_data: &UserAuthData,
   store: &dyn Store,
) -> Result<Option<(Ticket, Payment)>, ApiError> {
   let Some(payment) = store
      .find_payment_by_transaction(reference)
      .await
      .map_err(storage_error)?
   else {
      return Ok(None);
   };
   if payment.user_id != user_auth_data.user_id {
      warn!("{} replayed payment reference {} owned by another user", user_auth_data.user_id, reference);
      return Err(ApiError::Conflict(REFERENCE_USED.to_string()));
   }
   let ticket = store
      .find_ticket(payment.ticket_id)
      .await
      .map_err(storage_error)?
      .ok_or_else(|| ApiError::Internal(format!("payment {} has no ticket", payment.id)))?;
   info!("payment {} replayed by its owner", reference);
   Ok(Some((ticket, payment)))
}

pub async fn list_for_user(user_auth_data: &UserAuthData, store: &dyn Store) -> Result<Vec<Payment>, ApiError> {
   store
      .list_payments_for_user(user_auth_data.user_id)
      .await
      .map_err(storage_error)
}
