use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::config::security_config::{caller_id, load_user, Claims};
use crate::error::ApiError;
use crate::models::models::AppState;

#[derive(Serialize, ToSchema)]
pub struct CurrentUserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub account_type: String,
    pub status: String,
    pub is_admin: bool,
    pub kyc_verified: bool,
}

#[utoipa::path(
    get,
    path = "/api/current_user",
    responses(
        (status = 200, description = "Current user details", body = CurrentUserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Auth"
)]
pub async fn current_user_details(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CurrentUserResponse>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let user = load_user(conn, user_id)?;

    Ok(Json(CurrentUserResponse {
        id: user.id.to_string(),
        email: user.email,
        name: user.name,
        account_type: user.account_type,
        status: user.status,
        is_admin: user.is_admin,
        kyc_verified: user.kyc_verified,
    }))
}
