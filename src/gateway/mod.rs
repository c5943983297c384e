//! Outbound payment gateway.
//!
//! The verifier only asks the gateway whether a charge identified by its
//! transaction reference went through. Amount, currency and the canonical
//! reference all come from the gateway's answer, never from the client.

pub mod paystack;

use async_trait::async_trait;
use derive_more::Display;

pub use paystack::PaystackGateway;

pub const STATUS_SUCCESS: &str = "success";

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway knows the reference but the charge did not succeed, or it
    /// rejected the lookup itself.
    #[display(fmt = "payment not successful: {}", _0)]
    NotSuccessful(String),

    #[display(fmt = "gateway request timed out")]
    Timeout,

    #[display(fmt = "gateway unreachable: {}", _0)]
    Transport(String),

    #[display(fmt = "unexpected gateway response: {}", _0)]
    InvalidResponse(String),
}

impl std::error::Error for GatewayError {}

/// A charge the gateway confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedTransaction {
    pub reference: String,
    /// Minor currency units (kobo, cents).
    pub amount_minor: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Looks the reference up and accepts it only when the gateway reports
    /// the charge as successful. No retries.
    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError>;
}
