// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// JWT Claims structure. Tokens are issued by the LMS auth service.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the learner ID (as string).
    pub sub: String,
    /// User's role (e.g., 'student', 'professor').
    #[serde(default)]
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// The caller's raw bearer token, forwarded to the exam service.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects both the
/// decoded `Claims` and the raw `BearerToken` into the request extensions.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match verify_jwt(&token, &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            req.extensions_mut().insert(BearerToken(token));
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}
