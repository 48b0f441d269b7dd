use axum::{extract::State, http::StatusCode, Json};
use bcrypt::verify;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::config::security_config::create_token;
use crate::error::ApiError;
use crate::models::models::{AppState, User};

#[derive(Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub account_type: String,
    pub is_admin: bool,
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    payload.validate().map_err(ApiError::Validation)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    use crate::schema::users;

    let user = users::table
        .filter(users::email.eq(&payload.email))
        .select(User::as_select())
        .first::<User>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| {
            warn!("Login attempt for unknown email");
            ApiError::Auth("Invalid email or password".to_string())
        })?;

    let valid = verify(&payload.password, &user.password_hash).map_err(ApiError::Bcrypt)?;
    if !valid {
        warn!("Failed login for user {}", user.id);
        return Err(ApiError::Auth("Invalid email or password".to_string()).into());
    }

    if user.status == "suspended" {
        return Err(ApiError::Forbidden("Account is suspended".to_string()).into());
    }

    let token = create_token(&state, &user.id.to_string())?;

    info!("User {} logged in", user.id);
    Ok(Json(LoginResponse {
        token,
        user_id: user.id.to_string(),
        email: user.email,
        account_type: user.account_type,
        is_admin: user.is_admin,
    }))
}
