pub mod event;
pub mod payment;
pub mod ticket;
pub mod user;

use actix_web::web;

/// Everything mounted under `/api`.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/users").configure(user::init_routes))
        .service(web::scope("/events").configure(event::init_routes))
        .service(web::scope("/tickets").configure(ticket::init_routes))
        .service(web::scope("/payments").configure(payment::init_routes));
}
