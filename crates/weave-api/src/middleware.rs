use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};

use weave_types::api::Claims;

use crate::auth::{AppState, TOKEN_COOKIE};
use crate::error::ApiError;

/// Authenticated user id for routes where login is optional.
/// `None` when the request carried no valid token.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<i64>);

/// Token from `Authorization: Bearer`, falling back to the `token` cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(TOKEN_COOKIE)
            .map(|c| c.value().to_string())
    })
}

pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

/// Extract and validate the JWT; rejects with 401 when absent or invalid.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(req.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing token".into()))?;

    let claims = verify_token(&state.jwt_secret, &token)
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Like `require_auth`, but lets the request through anonymously.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let viewer = token_from_headers(req.headers())
        .and_then(|token| verify_token(&state.jwt_secret, &token))
        .map(|claims| claims.sub);

    req.extensions_mut().insert(Viewer(viewer));
    next.run(req).await
}
