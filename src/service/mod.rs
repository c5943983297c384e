pub mod auth;
pub mod crypto;
pub mod event;
pub mod log;
pub mod payment;
pub mod ticket;
pub mod user;

use crate::{errors::ApiError, store::StoreError};

/// Storage faults the caller cannot fix surface as 500 with the
/// underlying message.
pub(crate) fn storage_error(err: StoreError) -> ApiError {
    ::log::error!("storage failure: {}", err);
    ApiError::Internal(err.to_string())
}
