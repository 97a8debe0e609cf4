//! User registration. Only account storage is handled here; sessions, tokens
//! and login are left to an outer layer.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::{NewUser, UserRole},
    services::mailer::normalize_email,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/register", post(register))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let username = body.username.trim();
    if username.len() < 3 || username.len() > 50 {
        return Err(AppError::Validation(
            "username must be between 3 and 50 characters".to_string(),
        ));
    }
    if body.password.len() < 8 || body.password.len() > 100 {
        return Err(AppError::Validation(
            "password must be between 8 and 100 characters".to_string(),
        ));
    }
    let email = normalize_email(&body.email)
        .ok_or_else(|| AppError::Validation("email is invalid".to_string()))?;

    if state.store.user_by_username(username).await?.is_some() {
        return Err(AppError::Validation("Username already taken".to_string()));
    }
    if state.store.user_by_email(&email).await?.is_some() {
        return Err(AppError::Validation("Email already registered".to_string()));
    }

    let password_hash = hash_password(&body.password)?;
    let user = state
        .store
        .create_user(NewUser {
            username: username.to_string(),
            email,
            password_hash,
            full_name: body.full_name,
            profile_picture: body.profile_picture,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        }),
    ))
}
