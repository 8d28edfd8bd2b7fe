// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// Role a bearer token must carry to use the grading routes.
pub const TEACHER_ROLE: &str = "teacher";

/// Audience of magic-link tokens. Teacher tokens carry none, so the two never mix.
pub const MAGIC_AUDIENCE: &str = "exam-taking";

/// JWT Claims of a staff bearer token. Issued by the identity provider, only verified here.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the teacher's user id.
    pub sub: String,
    /// User's role (e.g., 'teacher', 'student').
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Claims of a student's magic link.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MagicClaims {
    /// Subject - the assignment id the link opens.
    pub sub: String,
    pub aud: String,
    pub exp: usize,
}

fn expires_at(expiration_seconds: u64) -> Result<usize, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs();

    Ok((now + expiration_seconds) as usize)
}

/// Signs a staff token. Used by tooling and tests; production tokens come from elsewhere.
pub fn sign_jwt(
    user_id: &str,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_owned(),
        role: role.to_owned(),
        exp: expires_at(expiration_seconds)?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a staff JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Mints the magic link token that lets a student open one assignment.
pub fn sign_magic_token(
    assignment_id: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = MagicClaims {
        sub: assignment_id.to_owned(),
        aud: MAGIC_AUDIENCE.to_owned(),
        exp: expires_at(expiration_seconds)?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies a magic link token and returns the assignment id it grants access to.
pub fn verify_magic_token(token: &str, secret: &str) -> Result<String, AppError> {
    let mut validation = Validation::default();
    validation.set_audience(&[MAGIC_AUDIENCE]);

    let token_data = decode::<MagicClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AppError::AuthError("Invalid or expired exam link".to_string()))?;

    Ok(token_data.claims.sub)
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, validates the 'Authorization: Bearer <token>' header.
/// If valid, injects `Claims` into the request extensions for handlers to use.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return Err(StatusCode::UNAUTHORIZED),
    };

    match verify_jwt(token, &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Axum Middleware: Teacher Authorization.
///
/// Must be used AFTER `auth_middleware`. Checks if the injected `Claims` has the 'teacher' role.
/// If not, returns 403 Forbidden.
pub async fn teacher_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if claims.role != TEACHER_ROLE {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}
