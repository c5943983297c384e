use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{AuthUserResponse, LoginUserRequest, NewUserDto},
    errors::ApiError,
    models::{Role, User},
    service::{
        auth::jwt::{self, JwtKeys},
        crypto, storage_error,
    },
    store::{Store, USERS_EMAIL_KEY},
};

const MIN_PASSWORD_LEN: usize = 8;

pub async fn create(dto: NewUserDto, store: &dyn Store) -> Result<User, ApiError> {
    let NewUserDto {
        name,
        email,
        password,
        password_confirm,
        role,
        organization_name,
    } = dto;
    let name = name.trim().to_string();
    let email = email.trim().to_lowercase();
    let role = role.unwrap_or(Role::Attendee);

    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    if !is_plausible_email(&email) {
        return Err(ApiError::bad_request("Valid email is required"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password != password_confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    if role == Role::Admin {
        return Err(ApiError::forbidden("Admin accounts cannot be self-registered"));
    }
    let organization_name = organization_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if role == Role::Organizer && organization_name.is_none() {
        return Err(ApiError::bad_request("Organization name is required for organizers"));
    }

    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        pwd_hash: crypto::hash_password(&password),
        role,
        organization_name,
        created_at: Utc::now(),
    };
    match store.create_user(user).await {
        Ok(user) => {
            info!("registered {} {}", user.role, user.id);
            Ok(user)
        }
        Err(err) if err.is_conflict_on(USERS_EMAIL_KEY) => {
            Err(ApiError::Conflict("Email is already registered".to_string()))
        }
        Err(err) => Err(storage_error(err)),
    }
}

pub async fn login(
    req: LoginUserRequest,
    keys: &JwtKeys,
    store: &dyn Store,
) -> Result<AuthUserResponse, ApiError> {
    let user = store
        .find_user_by_email(req.email.trim())
        .await
        .map_err(storage_error)?;
    match user {
        Some(user) if crypto::verify_password(&req.password, &user.pwd_hash) => {
            let token = jwt::create(keys, &user)?;
            info!("user {} logged in", user.id);
            Ok(AuthUserResponse { token, user })
        }
        _ => {
            warn!("failed login for {}", req.email);
            Err(ApiError::unauthorized("Invalid email or password"))
        }
    }
}

pub async fn get_by_id(id: Uuid, store: &dyn Store) -> Result<User, ApiError> {
    store
        .find_user(id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    fn registration(role: Option<Role>) -> NewUserDto {
        NewUserDto {
            name: "Chidi Okeke".to_string(),
            email: "Chidi@Example.com".to_string(),
            password: "sup3rsecret".to_string(),
            password_confirm: "sup3rsecret".to_string(),
            role,
            organization_name: None,
        }
    }

    #[actix_rt::test]
    async fn registers_attendee_by_default_and_logs_in() {
        let store = MemoryStore::new();
        let user = create(registration(None), &store).await.unwrap();
        assert_eq!(user.role, Role::Attendee);
        assert_eq!(user.email, "chidi@example.com");

        let keys = JwtKeys::new("secret", Duration::from_secs(60));
        let auth = login(
            LoginUserRequest {
                email: "chidi@example.com".to_string(),
                password: "sup3rsecret".to_string(),
            },
            &keys,
            &store,
        )
        .await
        .unwrap();
        assert_eq!(auth.user.id, user.id);
        assert!(!auth.token.is_empty());
    }

    #[actix_rt::test]
    async fn wrong_password_is_unauthorized() {
        let store = MemoryStore::new();
        create(registration(None), &store).await.unwrap();
        let keys = JwtKeys::new("secret", Duration::from_secs(60));
        let err = login(
            LoginUserRequest {
                email: "chidi@example.com".to_string(),
                password: "not-it".to_string(),
            },
            &keys,
            &store,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[actix_rt::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        create(registration(None), &store).await.unwrap();
        let err = create(registration(None), &store).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[actix_rt::test]
    async fn organizers_need_an_organization_and_admins_cannot_register() {
        let store = MemoryStore::new();
        let err = create(registration(Some(Role::Organizer)), &store).await.unwrap_err();
        assert_eq!(err.to_string(), "Organization name is required for organizers");

        let mut organizer = registration(Some(Role::Organizer));
        organizer.organization_name = Some("Lagos Live".to_string());
        assert_eq!(create(organizer, &store).await.unwrap().role, Role::Organizer);

        let err = create(registration(Some(Role::Admin)), &store).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[actix_rt::test]
    async fn mismatched_confirmation_is_rejected() {
        let store = MemoryStore::new();
        let mut dto = registration(None);
        dto.password_confirm = "different!".to_string();
        let err = create(dto, &store).await.unwrap_err();
        assert_eq!(err.to_string(), "Passwords do not match");
    }
}
