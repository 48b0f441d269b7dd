use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::security_config::{caller_id, load_user, require_admin, Claims};
use crate::error::ApiError;
use crate::ledger::{self, cents_from_amount, WithdrawalStatus};
use crate::models::models::{
    AppState, MessageResponse, NewTransaction, NewWithdrawal, StatusFilter, Wallet, Withdrawal,
};
use crate::schema::{transactions, wallets, withdrawals};
use crate::utility::{validate_pin, verify_pin};

#[derive(Deserialize, ToSchema, Validate)]
pub struct WithdrawalRequest {
    pub wallet_id: Uuid,
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,
    #[validate(length(min = 1, max = 255, message = "Destination is required"))]
    pub destination: String,
    #[validate(custom(function = "validate_pin"))]
    pub transaction_pin: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct VerifyPinRequest {
    #[validate(custom(function = "validate_pin"))]
    pub transaction_pin: String,
}

#[utoipa::path(
    get,
    path = "/api/withdrawals",
    responses(
        (status = 200, description = "Withdrawals visible to the caller", body = [Withdrawal]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Ledger"
)]
pub async fn list_withdrawals(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<Withdrawal>>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let caller = load_user(conn, user_id)?;

    let mut query = withdrawals::table.into_boxed();
    // Admins see everything; everyone else only their own rows.
    if !caller.is_admin {
        query = query.filter(withdrawals::user_id.eq(user_id));
    }
    if let Some(status) = &filter.status {
        query = query.filter(withdrawals::status.eq(status));
    }

    let rows = query
        .order(withdrawals::created_at.desc())
        .select(Withdrawal::as_select())
        .load::<Withdrawal>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/withdrawals",
    request_body = WithdrawalRequest,
    responses(
        (status = 201, description = "Withdrawal request submitted", body = Withdrawal),
        (status = 404, description = "Wallet not found"),
        (status = 422, description = "Insufficient balance or invalid PIN")
    ),
    security(("bearerAuth" = [])),
    tag = "Ledger"
)]
pub async fn create_withdrawal(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<WithdrawalRequest>,
) -> Result<(StatusCode, Json<Withdrawal>), (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let user_id = caller_id(&claims)?;
    let amount_cents = cents_from_amount(req.amount)?;

    info!(
        "Withdrawal request: user={}, wallet={}, amount={}",
        user_id, req.wallet_id, amount_cents
    );

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let caller = load_user(conn, user_id)?;
    verify_pin(&req.transaction_pin, caller.transaction_pin_hash.as_deref())?;

    let wallet = wallets::table
        .find(req.wallet_id)
        .filter(wallets::user_id.eq(user_id))
        .select(Wallet::as_select())
        .first::<Wallet>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Wallet not found".to_string()))?;

    // Advisory precheck. The balance is not debited until an admin
    // approves; the authoritative guard runs at approval time.
    if wallet.balance < amount_cents {
        error!(
            "Insufficient balance: available={}, required={}",
            wallet.balance, amount_cents
        );
        return Err(ApiError::InsufficientBalance.into());
    }

    let withdrawal = diesel::insert_into(withdrawals::table)
        .values(NewWithdrawal {
            user_id,
            wallet_id: wallet.id,
            amount: amount_cents,
            destination: req.destination,
            status: WithdrawalStatus::Pending.as_str().to_string(),
        })
        .returning(Withdrawal::as_returning())
        .get_result::<Withdrawal>(conn)
        .map_err(ApiError::Database)?;

    info!("Withdrawal {} created (pending)", withdrawal.id);
    Ok((StatusCode::CREATED, Json(withdrawal)))
}

#[utoipa::path(
    get,
    path = "/api/withdrawals/{id}",
    params(("id" = Uuid, Path, description = "Withdrawal id")),
    responses(
        (status = 200, description = "Withdrawal details", body = Withdrawal),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Withdrawal not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Ledger"
)]
pub async fn get_withdrawal(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Withdrawal>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let withdrawal = withdrawals::table
        .find(id)
        .select(Withdrawal::as_select())
        .first::<Withdrawal>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Withdrawal not found".to_string()))?;

    if withdrawal.user_id != user_id {
        let caller = load_user(conn, user_id)?;
        if !caller.is_admin {
            return Err(ApiError::Forbidden(
                "You do not have access to this withdrawal".to_string(),
            )
            .into());
        }
    }

    Ok(Json(withdrawal))
}

#[utoipa::path(
    post,
    path = "/api/withdrawals/verify-pin",
    request_body = VerifyPinRequest,
    responses(
        (status = 200, description = "PIN verified", body = MessageResponse),
        (status = 422, description = "Invalid PIN")
    ),
    security(("bearerAuth" = [])),
    tag = "Ledger"
)]
pub async fn verify_withdrawal_pin(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VerifyPinRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let caller = load_user(conn, user_id)?;
    verify_pin(&req.transaction_pin, caller.transaction_pin_hash.as_deref())?;

    Ok(Json(MessageResponse::new("PIN verified successfully")))
}

#[utoipa::path(
    put,
    path = "/api/withdrawals/{id}/status",
    params(("id" = Uuid, Path, description = "Withdrawal id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Withdrawal status updated", body = Withdrawal),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Withdrawal not found"),
        (status = 422, description = "Illegal status transition or insufficient balance")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn update_withdrawal_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Withdrawal>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let next = WithdrawalStatus::parse(&req.status).ok_or_else(|| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Unknown status '{}'", req.status),
        )
    })?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    // Transition, balance mutation and audit row commit or roll back as
    // one unit. Approval debits the wallet (debit-on-approval policy);
    // a failed payout re-credits it.
    let updated = conn.transaction(|conn| {
        let withdrawal = withdrawals::table
            .find(id)
            .select(Withdrawal::as_select())
            .first::<Withdrawal>(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Withdrawal not found".to_string()))?;

        let current = WithdrawalStatus::parse(&withdrawal.status)
            .ok_or_else(|| ApiError::Internal(format!("Corrupt status '{}'", withdrawal.status)))?;

        if !current.can_transition_to(next) {
            return Err(ApiError::Validation({
                let mut errs = validator::ValidationErrors::new();
                errs.add(
                    "status",
                    validator::ValidationError::new("illegal status transition"),
                );
                errs
            }));
        }

        // The update is predicated on the status we just read, so two
        // racing transitions serialize on the withdrawal row and the
        // loser matches zero rows instead of debiting a second time.
        let updated = diesel::update(
            withdrawals::table
                .find(withdrawal.id)
                .filter(withdrawals::status.eq(current.as_str())),
        )
        .set((
            withdrawals::status.eq(next.as_str()),
            withdrawals::reason.eq(req.reason.clone()),
        ))
        .returning(Withdrawal::as_returning())
        .get_result::<Withdrawal>(conn)
        .optional()?
        .ok_or_else(|| {
            ApiError::Validation({
                let mut errs = validator::ValidationErrors::new();
                errs.add(
                    "status",
                    validator::ValidationError::new("status changed concurrently"),
                );
                errs
            })
        })?;

        let wallet_currency = wallets::table
            .find(withdrawal.wallet_id)
            .select(wallets::currency)
            .first::<String>(conn)?;

        match next {
            WithdrawalStatus::Approved => {
                ledger::debit_wallet(conn, withdrawal.wallet_id, withdrawal.amount)?;
                diesel::insert_into(transactions::table)
                    .values(NewTransaction {
                        user_id: withdrawal.user_id,
                        wallet_id: Some(withdrawal.wallet_id),
                        amount: -withdrawal.amount,
                        transaction_type: "withdrawal".to_string(),
                        currency: wallet_currency.clone(),
                        status: "completed".to_string(),
                        description: Some(format!(
                            "Withdrawal {} approved, destination {}",
                            withdrawal.id, withdrawal.destination
                        )),
                        metadata: None,
                    })
                    .execute(conn)?;
            }
            WithdrawalStatus::Failed => {
                // Payout failed after approval: return the funds.
                ledger::credit_wallet(conn, withdrawal.wallet_id, withdrawal.amount)?;
                diesel::insert_into(transactions::table)
                    .values(NewTransaction {
                        user_id: withdrawal.user_id,
                        wallet_id: Some(withdrawal.wallet_id),
                        amount: withdrawal.amount,
                        transaction_type: "withdrawal_reversal".to_string(),
                        currency: wallet_currency.clone(),
                        status: "completed".to_string(),
                        description: Some(format!("Withdrawal {} failed, funds returned", withdrawal.id)),
                        metadata: None,
                    })
                    .execute(conn)?;
            }
            _ => {}
        }

        Ok::<Withdrawal, ApiError>(updated)
    })?;

    info!(
        "Withdrawal {} moved to {} by admin {}",
        updated.id, updated.status, admin_id
    );
    Ok(Json(updated))
}
