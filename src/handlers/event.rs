use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::{
   dto::{EventResponse, NewEventDto, UpdateEventDto},
   errors::ApiError,
   service::{self, auth::current_user},
   state::AppState,
};

#[post("")]
pub async fn create(req: HttpRequest, new_event_dto: web::Json<NewEventDto>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
   let user_auth_data = current_user(&req)?;
   let event = service::event::create(&user_auth_data, new_event_dto.into_inner(), state.store.as_ref()).await?;
   Ok(HttpResponse::Created().json(EventResponse { success: true, event }))
}

#[get("")]
pub async fn get_all(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
   let events = service::event::get_all(state.store.as_ref()).await?;
   Ok(HttpResponse::Ok().json(events))
}

#[get("/{id}")]
pub async fn get_by_id(id: web::Path<Uuid>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
   let event = service::event::get_by_id(id.into_inner(), state.store.as_ref()).await?;
   Ok(HttpResponse::Ok().json(EventResponse { success: true, event }))
}

#[put("/{id}")]
pub async fn update(
   req: HttpRequest,
   id: web::Path<Uuid>,
   update_event_dto: web::Json<UpdateEventDto>,
   state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
   let user_auth_data = current_user(&req)?;
   let event = service::event::update(&user_auth_data, id.into_inner(), update_event_dto.into_inner(), state.store.as_ref()).await?;
   Ok(HttpResponse::Ok().json(EventResponse { success: true, event }))
}

#[delete("/{id}")]
pub async fn cancel(req: HttpRequest, id: web::Path<Uuid>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
   let user_auth_data = current_user(&req)?;
   let event = service::event::cancel(&user_auth_data, id.into_inner(), state.store.as_ref()).await?;
   Ok(HttpResponse::Ok().json(EventResponse { success: true, event }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
   cfg.service(create)
      .service(get_all)
      .service(get_by_id)
      .service(update)
      .service(cancel);
}
