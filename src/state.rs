use std::sync::Arc;

use crate::{gateway::PaymentGateway, service::auth::jwt::JwtKeys, store::Store};

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, jwt: JwtKeys) -> Self {
        Self { store, gateway, jwt }
    }
}
