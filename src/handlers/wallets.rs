use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::security_config::{caller_id, load_user, Claims};
use crate::error::ApiError;
use crate::models::models::{AppState, NewWallet, Wallet};
use crate::schema::wallets;

pub static SUPPORTED_CURRENCIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(USD|NGN|GBP|EUR|CAD|AUD|JPY|CHF|CNY|SEK|NZD|MXN|SGD|HKD|NOK|KRW|TRY|INR|BRL|ZAR)$")
        .expect("Invalid currency regex")
});

#[derive(Deserialize, ToSchema)]
pub struct WalletFilter {
    pub currency: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateWalletRequest {
    #[validate(regex(path = "SUPPORTED_CURRENCIES", message = "Invalid currency"))]
    pub currency: String,
}

#[derive(Serialize, ToSchema)]
pub struct BalanceResponse {
    pub balance: i64,
    pub currency: String,
}

#[utoipa::path(
    get,
    path = "/api/wallets",
    responses(
        (status = 200, description = "Caller's wallets", body = [Wallet]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn list_wallets(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<WalletFilter>,
) -> Result<Json<Vec<Wallet>>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let mut query = wallets::table
        .filter(wallets::user_id.eq(user_id))
        .into_boxed();
    if let Some(currency) = &filter.currency {
        query = query.filter(wallets::currency.eq(currency.to_uppercase()));
    }
    if let Some(status) = &filter.status {
        query = query.filter(wallets::status.eq(status));
    }

    let rows = query
        .order(wallets::created_at.desc())
        .select(Wallet::as_select())
        .load::<Wallet>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/wallets",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = Wallet),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Validation error")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn create_wallet(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<Wallet>), (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    // New wallets always start empty; funds only enter through the
    // ledger so that every balance change has an audit row.
    let wallet = diesel::insert_into(wallets::table)
        .values(NewWallet {
            user_id,
            balance: 0,
            currency: req.currency.to_uppercase(),
            status: "active".to_string(),
        })
        .returning(Wallet::as_returning())
        .get_result::<Wallet>(conn)
        .map_err(ApiError::Database)?;

    info!("Created {} wallet {} for user {}", wallet.currency, wallet.id, user_id);
    Ok((StatusCode::CREATED, Json(wallet)))
}

/// Load a wallet the caller may see: the owner, or any admin.
pub fn authorized_wallet(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    user_id: Uuid,
) -> Result<Wallet, ApiError> {
    let wallet = wallets::table
        .find(wallet_id)
        .select(Wallet::as_select())
        .first::<Wallet>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Wallet not found".to_string()))?;

    if wallet.user_id != user_id {
        let caller = load_user(conn, user_id)?;
        if !caller.is_admin {
            return Err(ApiError::Forbidden(
                "You do not have access to this wallet".to_string(),
            ));
        }
    }
    Ok(wallet)
}

#[utoipa::path(
    get,
    path = "/api/wallets/{id}",
    params(("id" = Uuid, Path, description = "Wallet id")),
    responses(
        (status = 200, description = "Wallet details", body = Wallet),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Wallet not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Wallet>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let wallet = authorized_wallet(conn, id, user_id)?;
    Ok(Json(wallet))
}

#[utoipa::path(
    get,
    path = "/api/wallets/{id}/balance",
    params(("id" = Uuid, Path, description = "Wallet id")),
    responses(
        (status = 200, description = "Wallet balance in minor units", body = BalanceResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Wallet not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn wallet_balance(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let wallet = authorized_wallet(conn, id, user_id)?;
    Ok(Json(BalanceResponse {
        balance: wallet.balance,
        currency: wallet.currency,
    }))
}
