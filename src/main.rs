use std::{io, sync::Arc};

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};

use eventure::{
    config::Config,
    configure_app,
    db::{init_db_pool, run_migrations},
    gateway::PaystackGateway,
    service::{auth::jwt::JwtKeys, log::{init_logger, LoggerMiddleware}},
    state::AppState,
    store::PgStore,
};

fn startup_error(what: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", what, err);
    io::Error::new(io::ErrorKind::Other, format!("{what}: {err}"))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    init_logger();

    let config = Config::from_env().map_err(|e| startup_error("invalid configuration", e))?;
    let pool = init_db_pool(&config.database_url, config.max_connections)
        .await
        .map_err(|e| startup_error("failed to connect to postgresql", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| startup_error("failed to run migrations", e))?;

    let gateway = PaystackGateway::new(
        &config.paystack_base_url,
        &config.paystack_secret_key,
        config.gateway_timeout,
    )
    .map_err(|e| startup_error("failed to build payment gateway client", e))?;

    let state = web::Data::new(AppState::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(gateway),
        JwtKeys::new(&config.jwt_secret, config.jwt_ttl),
    ));

    info!("listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .configure(configure_app(state.clone()))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
