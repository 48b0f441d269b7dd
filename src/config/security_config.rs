use crate::error::ApiError;
use crate::models::models::{AppState, User};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{extract::State, http::StatusCode};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use http::HeaderMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub exp: usize,  // expiration time
    pub iat: usize,  // issued at
}

pub fn create_token(state: &AppState, user_id: &str) -> Result<String, ApiError> {
    let secret = state.jwt_secret.as_bytes();

    let now = Utc::now();
    let expiration_hours: i64 = env::var("JWT_EXPIRATION_HOURS")
        .unwrap_or_else(|_| "2".to_string())
        .parse()
        .map_err(|e| {
            error!("JWT expiration config error: {}", e);
            ApiError::Token(format!("Invalid JWT expiration configuration: {}", e))
        })?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + Duration::hours(expiration_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| {
        error!("JWT encoding error: {}", e);
        ApiError::Token(format!("Token creation failed: {}", e))
    })?;

    info!("Generated token for user {}", user_id);
    Ok(token)
}

pub fn verify_token(state: &AppState, token: &str) -> Result<Claims, String> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| format!("JWT verification error: {}", e))
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| ApiError::Auth("Authorization header required".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Auth("Invalid Authorization format".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Auth("Invalid Authorization format".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(ApiError::Auth("Invalid Authorization format".to_string()));
    }

    Ok(token.to_string())
}

pub fn is_token_blacklisted(conn: &mut PgConnection, tokn: &str) -> Result<bool, ApiError> {
    use crate::schema::blacklisted_tokens::dsl::*;

    let result = blacklisted_tokens
        .filter(token.eq(tokn))
        .filter(expires_at.gt(Utc::now()))
        .select(token)
        .first::<String>(conn)
        .optional()?;

    if result.is_some() {
        warn!("Blacklisted token presented");
    }
    Ok(result.is_some())
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = match extract_bearer_token(req.headers()) {
        Ok(token) => token,
        Err(e) => return Err(e.into_response()),
    };

    let mut conn = state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string()).into_response()
    })?;

    // Fail closed if the blacklist cannot be consulted.
    match is_token_blacklisted(&mut conn, &token) {
        Ok(true) => {
            return Err(ApiError::Auth("Token has been invalidated".to_string()).into_response());
        }
        Ok(false) => {}
        Err(e) => {
            error!("Failed to check token blacklist: {}", e);
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication service temporarily unavailable".to_string(),
            )
                .into_response());
        }
    }

    let claims = match verify_token(&state, &token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("JWT verification failed: {}", e);
            return Err(
                ApiError::Auth("Token verification failed".to_string()).into_response(),
            );
        }
    };

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Parse the subject claim into the caller's user id.
pub fn caller_id(claims: &Claims) -> Result<Uuid, ApiError> {
    Uuid::parse_str(&claims.sub).map_err(|e| {
        error!("Invalid user ID in token: {}", e);
        ApiError::Auth("Invalid user ID".to_string())
    })
}

pub fn load_user(conn: &mut PgConnection, user_id: Uuid) -> Result<User, ApiError> {
    use crate::schema::users;

    users::table
        .find(user_id)
        .select(User::as_select())
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Admin operations bypass ownership checks, so the flag is read from the
/// user row on every call rather than baked into the token.
pub fn require_admin(conn: &mut PgConnection, user_id: Uuid) -> Result<User, ApiError> {
    let user = load_user(conn, user_id)?;
    if !user.is_admin {
        warn!("Non-admin user {} attempted an admin operation", user_id);
        return Err(ApiError::Forbidden(
            "Administrator privileges required".to_string(),
        ));
    }
    Ok(user)
}
