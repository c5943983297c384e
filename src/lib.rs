pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod service;
pub mod state;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use actix_web::web;
use sqlx::{postgres::Postgres, Pool};

use crate::{errors::json_error_handler, service::auth::AuthMiddleware, state::AppState};

pub type PGPool = Pool<Postgres>;

/// Mounts the whole API on an `App`, shared by the server and the HTTP tests.
pub fn configure_app(state: web::Data<AppState>) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        let keys = state.jwt.clone();
        cfg.app_data(state)
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware { keys })
                    .configure(handlers::init_routes),
            );
    }
}
