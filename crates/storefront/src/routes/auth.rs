//! Registration, login, and logout.
//!
//! Password hashes use Argon2id with per-hash salts. Login failures are
//! deliberately indistinguishable (wrong email vs wrong password).

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use guardlan_core::Email;

use crate::db::{CustomerRepository, RepositoryError};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::auth::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::state::AppState;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<UserResponse>> {
    let email = Email::parse(&body.email)
        .map_err(|e| AppError::BadRequest(format!("Invalid email: {e}")))?;

    let display_name = body.display_name.trim();
    if display_name.is_empty() {
        return Err(AppError::BadRequest("Display name is required".to_owned()));
    }
    if body.password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let password_hash = hash_password(&body.password)?;

    let customers = CustomerRepository::new(state.pool());
    let profile = customers
        .create_with_password(&email, display_name, &password_hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::BadRequest("An account with this email already exists".to_owned())
            }
            other => AppError::Database(other),
        })?;

    let user = CurrentUser {
        id: profile.id,
        email: profile.email.clone(),
    };
    set_current_user(&session, &user)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    set_sentry_user(&profile.id, Some(profile.email.as_str()));

    tracing::info!(user_id = %profile.id, "Registered new customer");

    Ok(Json(UserResponse {
        id: profile.id.to_string(),
        email: profile.email.as_str().to_owned(),
        display_name: profile.display_name,
    }))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<UserResponse>> {
    let email = Email::parse(&body.email)
        .map_err(|_| AppError::Unauthorized("invalid credentials".to_owned()))?;

    let customers = CustomerRepository::new(state.pool());
    let profile = customers
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_owned()))?;

    let hash = customers
        .password_hash(profile.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_owned()))?;

    verify_password(&body.password, &hash)?;

    // Fresh session ID on privilege change
    session
        .cycle_id()
        .await
        .map_err(|e| AppError::Internal(format!("session cycle failed: {e}")))?;

    let user = CurrentUser {
        id: profile.id,
        email: profile.email.clone(),
    };
    set_current_user(&session, &user)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    set_sentry_user(&profile.id, Some(profile.email.as_str()));

    tracing::info!(user_id = %profile.id, "Customer logged in");

    Ok(Json(UserResponse {
        id: profile.id.to_string(),
        email: profile.email.as_str().to_owned(),
        display_name: profile.display_name,
    }))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Result<Json<serde_json::Value>> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session clear failed: {e}")))?;
    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("session flush failed: {e}")))?;
    clear_sentry_user();

    Ok(Json(serde_json::json!({"loggedOut": true})))
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("stored hash unparseable: {e}")))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized("invalid credentials".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(verify_password("wrong password", &hash).is_err());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same input").expect("hash");
        let b = hash_password("same input").expect("hash");
        assert_ne!(a, b);
    }
}
