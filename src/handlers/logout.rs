use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use http::HeaderMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::security_config::Claims;
use crate::error::ApiError;
use crate::models::models::{AppState, MessageResponse};

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearerAuth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| ApiError::Auth("Authorization header required".to_string()))?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    use crate::schema::blacklisted_tokens;

    // Blacklist until the token's own expiry; rows past that are inert.
    let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0)
        .ok_or_else(|| ApiError::Internal("Invalid token expiry".to_string()))?;

    diesel::insert_into(blacklisted_tokens::table)
        .values((
            blacklisted_tokens::token.eq(token),
            blacklisted_tokens::expires_at.eq(expires_at),
        ))
        .on_conflict(blacklisted_tokens::token)
        .do_nothing()
        .execute(conn)
        .map_err(ApiError::Database)?;

    info!("User {} logged out", claims.sub);
    Ok(Json(MessageResponse::new("Logged out")))
}
