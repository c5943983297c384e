use std::future::{ready, Ready};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    HttpMessage, HttpRequest, ResponseError,
};
use bitflags::bitflags;
use futures_util::future::LocalBoxFuture;
use log::warn;
use uuid::Uuid;

use crate::{errors::ApiError, models::Role};

use self::jwt::JwtKeys;

pub const BEARER: &str = "Bearer ";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u8 {
        const PURCHASE = 0b0001;
        const MANAGE_EVENTS = 0b0010;
        const CHECK_IN = 0b0100;
    }
}

impl Permissions {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Attendee => Permissions::PURCHASE,
            Role::Organizer => {
                Permissions::PURCHASE | Permissions::MANAGE_EVENTS | Permissions::CHECK_IN
            }
            Role::Admin => Permissions::all(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserAuthData {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl UserAuthData {
    pub fn permissions(&self) -> Permissions {
        Permissions::for_role(self.role)
    }

    pub fn require(&self, needed: Permissions, denied: &str) -> Result<(), ApiError> {
        if self.permissions().contains(needed) {
            Ok(())
        } else {
            Err(ApiError::forbidden(denied))
        }
    }
}

/// The authenticated caller, or 401 when the request carried no token.
pub fn current_user(req: &HttpRequest) -> Result<UserAuthData, ApiError> {
    req.extensions()
        .get::<UserAuthData>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

/// Decodes the bearer token, when present, into [`UserAuthData`] stored in
/// the request extensions. Requests without an `Authorization` header pass
/// through anonymously; a bad or expired token ends the request with 401.
pub struct AuthMiddleware {
    pub keys: JwtKeys,
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            keys: self.keys.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    keys: JwtKeys,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let auth = match jwt::parse_request(req.request()) {
            Ok(None) => None,
            Ok(Some(token)) => match jwt::decode_claims(&self.keys, &token) {
                Ok(claims) => Some(UserAuthData {
                    user_id: claims.user_id,
                    email: claims.email,
                    role: claims.role,
                }),
                Err(err) => return reject(req, err),
            },
            Err(err) => return reject(req, err),
        };
        if let Some(user) = auth {
            req.extensions_mut().insert(user);
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_left_body())
        })
    }
}

fn reject<B: 'static>(
    req: ServiceRequest,
    err: ApiError,
) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, actix_web::Error>> {
    warn!("rejected {} {}: {}", req.method(), req.path(), err);
    let response = req.into_response(err.error_response()).map_into_right_body();
    Box::pin(async move { Ok(response) })
}

pub mod jwt {
    use std::time::Duration;

    use actix_web::HttpRequest;
    use chrono::Utc;
    use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
    use log::debug;

    use super::BEARER;
    use crate::{dto::Claims, errors::ApiError, models::User};

    #[derive(Clone)]
    pub struct JwtKeys {
        encoding: EncodingKey,
        decoding: DecodingKey,
        ttl: Duration,
    }

    impl JwtKeys {
        pub fn new(secret: &str, ttl: Duration) -> Self {
            Self {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                ttl,
            }
        }
    }

    pub fn create(keys: &JwtKeys, user: &User) -> Result<String, ApiError> {
        let exp = Utc::now().timestamp() as usize + keys.ttl.as_secs() as usize;
        let claims = Claims::new(user, exp);
        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    pub fn decode_claims(keys: &JwtKeys, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("token rejected: {}", e);
                ApiError::unauthorized("Invalid or expired token")
            })
    }

    /// `Ok(None)` when there is no `Authorization` header at all.
    pub fn parse_request(req: &HttpRequest) -> Result<Option<String>, ApiError> {
        let Some(auth_header) = req.headers().get("Authorization") else {
            return Ok(None);
        };
        auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix(BEARER))
            .map(|token| Some(token.trim().to_string()))
            .ok_or_else(|| ApiError::unauthorized("Authorization header must be 'Bearer <token>'"))
    }
}
