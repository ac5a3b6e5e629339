use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use weave_db::models::{NewUser, Registration, username_length_ok};
use weave_gateway::Hub;
use weave_types::api::{ApiResponse, AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;

pub const TOKEN_COOKIE: &str = "token";

const MIN_PASSWORD_LEN: usize = 6;

pub(crate) const USERNAME_LENGTH: &str = "Username must be 3 to 32 characters";

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub hub: Hub,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub default_photo: String,
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    // Validate input
    if req.password != req.confirm_password {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    if !is_valid_email(&req.email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !username_length_ok(&req.username) {
        return Err(ApiError::bad_request(USERNAME_LENGTH));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Name cannot be empty"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let photo = state.default_photo.clone();
    let (username, email, name) = (req.username, req.email, req.name.trim().to_string());
    let (outcome, username, email) = state
        .hub
        .db(move |db| {
            let outcome = db.register_user(&NewUser {
                username: &username,
                email: &email,
                password_hash: &password_hash,
                full_name: &name,
                profile_photo_path: &photo,
            })?;
            Ok((outcome, username, email))
        })
        .await?;

    let user_id = match outcome {
        Registration::Created(id) => id,
        Registration::EmailTaken => return Err(ApiError::conflict("Email already in use")),
        Registration::UsernameTaken => return Err(ApiError::conflict("Username already in use")),
    };

    info!("Registered user {} ({})", user_id, username);

    let token = create_token(&state.jwt_secret, user_id, &email, state.token_ttl_secs)?;
    let jar = jar.add(token_cookie(&token, state.token_ttl_secs));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(ApiResponse::ok(
            "User registered successfully",
            AuthResponse {
                user_id,
                username,
                token,
            },
        )),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let identifier = req.identifier.clone();
    let user = state
        .hub
        .db(move |db| db.find_user_by_identifier(&identifier))
        .await?
        .ok_or_else(invalid)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| anyhow::anyhow!("stored hash for user {} is corrupt: {}", user.id, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let token = create_token(&state.jwt_secret, user.id, &user.email, state.token_ttl_secs)?;
    let jar = jar.add(token_cookie(&token, state.token_ttl_secs));

    Ok((
        jar,
        Json(ApiResponse::ok(
            "Login successful",
            AuthResponse {
                user_id: user.id,
                username: user.username,
                token,
            },
        )),
    ))
}

pub fn create_token(secret: &str, user_id: i64, email: &str, ttl_secs: u64) -> anyhow::Result<String> {
    let ttl = i64::try_from(ttl_secs)?;
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::seconds(ttl)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// The cookie expires together with the token it carries.
fn token_cookie(token: &str, ttl_secs: u64) -> Cookie<'static> {
    let max_age = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    Cookie::build((TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// One `@`, a non-empty local part and a dotted domain without empty labels.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
