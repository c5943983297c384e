use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use super::{GatewayError, PaymentGateway, VerifiedTransaction, STATUS_SUCCESS};

/// Paystack's transaction-verification endpoint,
/// `GET /transaction/verify/{reference}` authenticated with the secret key.
pub struct PaystackGateway {
    client: reqwest::Client,
    base_url: Url,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    message: Option<String>,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    reference: String,
    amount: i64,
    currency: String,
    gateway_response: Option<String>,
}

impl PaystackGateway {
    pub fn new(base_url: &str, secret_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::InvalidResponse(format!("bad base url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidResponse(format!(
                "bad base url '{base_url}'"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            secret_key: secret_key.to_string(),
        })
    }

    fn verify_url(&self, reference: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["transaction", "verify", reference]);
        }
        url
    }
}

fn classify(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(err.to_string())
    }
}

/// Maps the HTTP status and body of a verification call onto the verifier's
/// outcome.
fn interpret(status: StatusCode, body: &[u8]) -> Result<VerifiedTransaction, GatewayError> {
    if status.is_server_error() {
        return Err(GatewayError::Transport(format!("HTTP {status}")));
    }
    if status.is_client_error() {
        let message = serde_json::from_slice::<VerifyResponse>(body)
            .ok()
            .and_then(|r| r.message)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(GatewayError::NotSuccessful(message));
    }

    let response: VerifyResponse = serde_json::from_slice(body)
        .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
    if !response.status {
        return Err(GatewayError::NotSuccessful(
            response.message.unwrap_or_else(|| "verification failed".to_string()),
        ));
    }
    let data = response
        .data
        .ok_or_else(|| GatewayError::InvalidResponse("missing data".to_string()))?;
    if data.status != STATUS_SUCCESS {
        return Err(GatewayError::NotSuccessful(
            data.gateway_response.unwrap_or(data.status),
        ));
    }
    if data.amount < 0 {
        return Err(GatewayError::InvalidResponse(format!(
            "negative amount {}",
            data.amount
        )));
    }
    Ok(VerifiedTransaction {
        reference: data.reference,
        amount_minor: data.amount,
        currency: data.currency.to_uppercase(),
    })
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError> {
        let url = self.verify_url(reference);
        debug!("paystack: verifying reference {}", reference);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        let body = response.bytes().await.map_err(classify)?;
        let outcome = interpret(status, &body);
        if let Err(err) = &outcome {
            warn!("paystack: reference {} rejected: {}", reference, err);
        }
        outcome
    }
}
