use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::Display;
use serde::Serialize;

use crate::gateway::GatewayError;

/// Every failure a request can end with. The display text is what the client
/// sees in the `error` field of the response body.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "Payment not successful")]
    PaymentNotSuccessful,

    #[display(fmt = "{}", _0)]
    Gateway(String),

    #[display(fmt = "Payment gateway timed out")]
    Timeout,

    #[display(fmt = "{}", _0)]
    Internal(String),
}

impl std::error::Error for ApiError {}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }
}

impl error::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(ErrorBody {
                error: self.to_string(),
            })
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PaymentNotSuccessful => StatusCode::BAD_REQUEST,
            ApiError::Gateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotSuccessful(_) => ApiError::PaymentNotSuccessful,
            GatewayError::Timeout => ApiError::Timeout,
            GatewayError::Transport(msg) | GatewayError::InvalidResponse(msg) => {
                ApiError::Gateway(format!("Payment gateway error: {msg}"))
            }
        }
    }
}

/// Turns body extraction failures into the same `{error}` shape as every
/// other failure.
pub fn json_error_handler(
    err: error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    ApiError::BadRequest(format!("Invalid request body: {err}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, ResponseError};

    #[test]
    fn client_faults_map_to_4xx() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::PaymentNotSuccessful.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_and_storage_faults_map_to_5xx() {
        assert_eq!(ApiError::Gateway("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ApiError::Internal("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn gateway_errors_keep_their_category() {
        let declined: ApiError = GatewayError::NotSuccessful("abandoned".into()).into();
        assert!(matches!(declined, ApiError::PaymentNotSuccessful));
        let hung: ApiError = GatewayError::Timeout.into();
        assert!(matches!(hung, ApiError::Timeout));
        let broken: ApiError = GatewayError::Transport("connection reset".into()).into();
        assert_eq!(broken.to_string(), "Payment gateway error: connection reset");
    }

    #[actix_rt::test]
    async fn error_response_carries_the_message_as_json() {
        let response = ApiError::not_found("Ticket not found").error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({ "error": "Ticket not found" }));
    }
}
