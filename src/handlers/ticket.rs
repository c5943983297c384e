use actix_web::{get, post, web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::{
   dto::{CheckInResponse, FreeTicketRequest, TicketResponse, ValidateTicketRequest},
   errors::ApiError,
   service::{self, auth::current_user},
   state::AppState,
};

#[post("/free")]
pub async fn issue_free(req: HttpRequest, body: web::Json<FreeTicketRequest>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
   let user_auth_data = current_user(&req)?;
   let ticket = service::ticket::issue_free(body.into_inner(), &user_auth_data, state.store.as_ref()).await?;
   Ok(HttpResponse::Ok().json(TicketResponse { success: true, ticket }))
}

#[post("/validate")]
pub async fn validate(req: HttpRequest, body: web::Json<ValidateTicketRequest>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
   let user_auth_data = current_user(&req)?;
   let (ticket, was_checked_in) =
      service::ticket::validate(body.into_inner(), &user_auth_data, state.store.as_ref()).await?;
   Ok(HttpResponse::Ok().json(CheckInResponse {
      success: true,
      ticket,
      was_checked_in,
   }))
}

#[get("")]
pub async fn get_mine(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
   let user_auth_data = current_user(&req)?;
   let tickets = service::ticket::list_for_user(&user_auth_data, state.store.as_ref()).await?;
   Ok(HttpResponse::Ok().json(tickets))
}

#[get("/{id}")]
pub async fn get_by_id(req: HttpRequest, id: web::Path<Uuid>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
   let user_auth_data = current_user(&req)?;
   let ticket = service::ticket::get_for_caller(id.into_inner(), &user_auth_data, state.store.as_ref()).await?;
   Ok(HttpResponse::Ok().json(ticket))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
   cfg.service(issue_free)
      .service(validate)
      .service(get_mine)
      .service(get_by_id);
}
