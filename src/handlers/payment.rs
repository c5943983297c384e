use actix_web::{get, post, web, HttpRequest, HttpResponse};

use crate::{
   dto::{PaidTicketResponse, VerifyPaymentRequest},
   errors::ApiError,
   service::{self, auth::current_user},
   state::AppState,
};

#[post("/verify")]
pub async fn verify(req: HttpRequest, body: web::Json<VerifyPaymentRequest>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
   let user_auth_data = current_user(&req)?;
   let (ticket, payment) = service::payment::verify_and_issue(
      body.into_inner(),
      &user_auth_data,
      state.store.as_ref(),
      state.gateway.as_ref(),
   )
   .await?;
   Ok(HttpResponse::Ok().json(PaidTicketResponse {
      success: true,
      ticket,
      payment,
   }))
}

#[get("")]
pub async fn get_mine(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
   let user_auth_data = current_user(&req)?;
   let payments = service::payment::list_for_user(&user_auth_data, state.store.as_ref()).await?;
   Ok(HttpResponse::Ok().json(payments))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
   cfg.service(verify).service(get_mine);
}
