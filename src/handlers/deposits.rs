use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::security_config::{caller_id, load_user, Claims};
use crate::error::ApiError;
use crate::handlers::wallets::SUPPORTED_CURRENCIES;
use crate::ledger::cents_from_amount;
use crate::models::models::{AppState, NewTransaction, StatusFilter, Transaction, Wallet};
use crate::schema::{transactions, wallets};

const PAYMENT_METHODS: &[&str] = &["card", "bank_transfer", "crypto", "paypal"];

#[derive(Deserialize, ToSchema, Validate)]
pub struct DepositRequest {
    pub wallet_id: Uuid,
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,
    #[validate(regex(path = "SUPPORTED_CURRENCIES", message = "Invalid currency"))]
    pub currency: String,
    pub payment_method: String,
}

#[utoipa::path(
    get,
    path = "/api/deposits",
    responses(
        (status = 200, description = "Caller's deposits", body = [Transaction]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Ledger"
)]
pub async fn list_deposits(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<Transaction>>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let mut query = transactions::table
        .filter(transactions::user_id.eq(user_id))
        .filter(transactions::transaction_type.eq("deposit"))
        .into_boxed();
    if let Some(status) = &filter.status {
        query = query.filter(transactions::status.eq(status));
    }

    let rows = query
        .order(transactions::created_at.desc())
        .select(Transaction::as_select())
        .load::<Transaction>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/deposits",
    request_body = DepositRequest,
    responses(
        (status = 201, description = "Deposit request submitted", body = Transaction),
        (status = 404, description = "Wallet not found"),
        (status = 422, description = "Validation error")
    ),
    security(("bearerAuth" = [])),
    tag = "Ledger"
)]
pub async fn create_deposit(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DepositRequest>,
) -> Result<(StatusCode, Json<Transaction>), (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    if !PAYMENT_METHODS.contains(&req.payment_method.as_str()) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "payment_method must be card, bank_transfer, crypto or paypal".to_string(),
        ));
    }
    let user_id = caller_id(&claims)?;
    let amount_cents = cents_from_amount(req.amount)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    // Deposits must target a wallet the caller owns.
    let wallet = wallets::table
        .find(req.wallet_id)
        .filter(wallets::user_id.eq(user_id))
        .select(Wallet::as_select())
        .first::<Wallet>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Wallet not found".to_string()))?;

    // Settlement is external; the row stays pending and the balance is
    // only credited when the payment provider confirms.
    let deposit = diesel::insert_into(transactions::table)
        .values(NewTransaction {
            user_id,
            wallet_id: Some(wallet.id),
            amount: amount_cents,
            transaction_type: "deposit".to_string(),
            currency: req.currency.to_uppercase(),
            status: "pending".to_string(),
            description: Some(format!("Deposit via {}", req.payment_method)),
            metadata: Some(json!({ "payment_method": req.payment_method })),
        })
        .returning(Transaction::as_returning())
        .get_result::<Transaction>(conn)
        .map_err(ApiError::Database)?;

    info!(
        "Deposit request {}: user={}, amount={} {}",
        deposit.id, user_id, amount_cents, deposit.currency
    );
    Ok((StatusCode::CREATED, Json(deposit)))
}

#[utoipa::path(
    get,
    path = "/api/deposits/{id}",
    params(("id" = Uuid, Path, description = "Deposit id")),
    responses(
        (status = 200, description = "Deposit details", body = Transaction),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Deposit not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Ledger"
)]
pub async fn get_deposit(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let deposit = transactions::table
        .find(id)
        .filter(transactions::transaction_type.eq("deposit"))
        .select(Transaction::as_select())
        .first::<Transaction>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Deposit not found".to_string()))?;

    if deposit.user_id != user_id {
        let caller = load_user(conn, user_id)?;
        if !caller.is_admin {
            return Err(ApiError::Forbidden(
                "You do not have access to this deposit".to_string(),
            )
            .into());
        }
    }

    Ok(Json(deposit))
}
