use actix_web::{get, post, web, HttpRequest, HttpResponse};

use crate::{
    dto::{LoginUserRequest, NewUserDto},
    errors::ApiError,
    service::{self, auth::current_user},
    state::AppState,
};

#[post("/register")]
pub async fn register(dto: web::Json<NewUserDto>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = service::user::create(dto.into_inner(), state.store.as_ref()).await?;
    Ok(HttpResponse::Created().json(user))
}

#[post("/login")]
pub async fn login(dto: web::Json<LoginUserRequest>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let response = service::user::login(dto.into_inner(), &state.jwt, state.store.as_ref()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/me")]
pub async fn me(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user_auth_data = current_user(&req)?;
    let user = service::user::get_by_id(user_auth_data.user_id, state.store.as_ref()).await?;
    Ok(HttpResponse::Ok().json(user))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register).service(login).service(me);
}
