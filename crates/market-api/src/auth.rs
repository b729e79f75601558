use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use chrono::Duration;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use market_db::Database;
use market_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use market_types::models::Role;

use crate::error::ApiError;
use crate::notify::Notifier;
use crate::run_db;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub notifier: Notifier,
    /// How long an approved listing stays live.
    pub listing_ttl: Duration,
    /// Usernames that receive the admin role when they register.
    pub admin_usernames: Vec<String>,
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();

    // Validate input
    let mut errors = Vec::new();
    if username.len() < 3 || username.len() > 32 {
        errors.push("Username must be between 3 and 32 characters".to_string());
    }
    if !looks_like_email(&email) {
        errors.push("Please enter a valid email address".to_string());
    }
    if req.password.len() < 8 {
        errors.push("Password must be at least 8 characters".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let lookup = username.clone();
    let taken = run_db(&state, move |db| db.get_user_by_username(&lookup)).await?;
    if taken.is_some() {
        return Err(ApiError::Conflict("Username is already taken".to_string()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();

    let role = if state.admin_usernames.iter().any(|a| a == &username) {
        Role::Admin
    } else {
        Role::User
    };

    let user_id = Uuid::new_v4();
    let (uid, name) = (user_id.to_string(), username.clone());
    let created =
        run_db(&state, move |db| db.create_user(&uid, &name, &email, &password_hash, role.as_str())).await?;
    // The lookup above can race another registration for the same name.
    if !created {
        return Err(ApiError::Conflict("Username is already taken".to_string()));
    }

    let token = create_token(&state.jwt_secret, user_id, &username, role)?;
    info!("Registered user {} ({})", username, role);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            user_id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let user = run_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Stored password hash is corrupt: {}", e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user = user.to_user()?;
    let token = create_token(&state.jwt_secret, user.id, &user.username, user.role)?;

    Ok(Json(LoginResponse {
        success: true,
        user_id: user.id,
        username: user.username,
        role: user.role,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: (chrono::Utc::now() + Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
