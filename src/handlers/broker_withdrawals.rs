use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::security_config::{caller_id, require_admin, Claims};
use crate::error::ApiError;
use crate::handlers::wallets::SUPPORTED_CURRENCIES;
use crate::ledger::{self, cents_from_amount, WithdrawalStatus};
use crate::models::models::{
    AppState, BrokerUser, BrokerWithdrawal, NewBrokerTransaction, NewBrokerWithdrawal, StatusFilter,
};
use crate::schema::{broker_transactions, broker_users, broker_withdrawals};
use crate::utility::{validate_pin, verify_pin};

#[derive(Deserialize, ToSchema, Validate)]
pub struct BrokerWithdrawalRequest {
    /// Broker account to withdraw from.
    pub wallet_id: Uuid,
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,
    #[validate(regex(path = "SUPPORTED_CURRENCIES", message = "Invalid currency"))]
    pub currency: String,
    #[validate(length(min = 1, max = 255))]
    pub withdrawal_method: String,
    #[validate(length(min = 1, max = 255))]
    pub destination: String,
    #[validate(custom(function = "validate_pin"))]
    pub pin: String,
}

#[derive(Deserialize, ToSchema)]
pub struct BrokerStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct BrokerVerifyPinRequest {
    pub wallet_id: Uuid,
    #[validate(custom(function = "validate_pin"))]
    pub pin: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerifiedResponse {
    pub verified: bool,
}

fn load_broker(conn: &mut PgConnection, id: Uuid) -> Result<BrokerUser, ApiError> {
    broker_users::table
        .find(id)
        .select(BrokerUser::as_select())
        .first::<BrokerUser>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Broker user not found".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/admin/broker-withdrawals",
    responses(
        (status = 200, description = "Broker withdrawals", body = [BrokerWithdrawal]),
        (status = 403, description = "Admin only")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn list_broker_withdrawals(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<BrokerWithdrawal>>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let mut query = broker_withdrawals::table.into_boxed();
    if let Some(status) = &filter.status {
        query = query.filter(broker_withdrawals::status.eq(status));
    }

    let rows = query
        .order(broker_withdrawals::created_at.desc())
        .select(BrokerWithdrawal::as_select())
        .load::<BrokerWithdrawal>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/admin/broker-withdrawals",
    request_body = BrokerWithdrawalRequest,
    responses(
        (status = 201, description = "Broker withdrawal submitted", body = BrokerWithdrawal),
        (status = 403, description = "Invalid PIN or insufficient balance"),
        (status = 404, description = "Broker user not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn create_broker_withdrawal(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BrokerWithdrawalRequest>,
) -> Result<(StatusCode, Json<BrokerWithdrawal>), (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let caller = caller_id(&claims)?;
    let amount_cents = cents_from_amount(req.amount)?;

    info!(
        "Broker withdrawal request: broker={}, amount={}, caller={}",
        req.wallet_id, amount_cents, caller
    );

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let broker = load_broker(conn, req.wallet_id)?;

    // This endpoint documents PIN and balance failures as 403.
    if verify_pin(&req.pin, broker.pin_hash.as_deref()).is_err() {
        return Err(ApiError::Forbidden("Invalid PIN".to_string()).into());
    }
    // Advisory precheck; the balance is only debited on approval, where
    // the guarded update is authoritative.
    if broker.balance < amount_cents {
        return Err(ApiError::Forbidden("Insufficient balance".to_string()).into());
    }

    let withdrawal = diesel::insert_into(broker_withdrawals::table)
        .values(NewBrokerWithdrawal {
            broker_user_id: broker.id,
            amount: amount_cents,
            currency: req.currency.to_uppercase(),
            withdrawal_method: req.withdrawal_method,
            destination: req.destination,
            status: WithdrawalStatus::Pending.as_str().to_string(),
        })
        .returning(BrokerWithdrawal::as_returning())
        .get_result::<BrokerWithdrawal>(conn)
        .map_err(ApiError::Database)?;

    info!("Broker withdrawal {} created (pending)", withdrawal.id);
    Ok((StatusCode::CREATED, Json(withdrawal)))
}

#[utoipa::path(
    get,
    path = "/api/admin/broker-withdrawals/{id}",
    params(("id" = Uuid, Path, description = "Broker withdrawal id")),
    responses(
        (status = 200, description = "Broker withdrawal details", body = BrokerWithdrawal),
        (status = 404, description = "Broker withdrawal not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn get_broker_withdrawal(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BrokerWithdrawal>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let withdrawal = broker_withdrawals::table
        .find(id)
        .select(BrokerWithdrawal::as_select())
        .first::<BrokerWithdrawal>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Broker withdrawal not found".to_string()))?;

    Ok(Json(withdrawal))
}

#[utoipa::path(
    post,
    path = "/api/admin/broker-withdrawals/verify-pin",
    request_body = BrokerVerifyPinRequest,
    responses(
        (status = 200, description = "Verification result", body = VerifiedResponse),
        (status = 404, description = "Broker user not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn verify_broker_pin(
    State(state): State<Arc<AppState>>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<BrokerVerifyPinRequest>,
) -> Result<Json<VerifiedResponse>, (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let broker = load_broker(conn, req.wallet_id)?;
    let verified = verify_pin(&req.pin, broker.pin_hash.as_deref()).is_ok();

    Ok(Json(VerifiedResponse { verified }))
}

#[utoipa::path(
    put,
    path = "/api/admin/broker-withdrawals/{id}/status",
    params(("id" = Uuid, Path, description = "Broker withdrawal id")),
    request_body = BrokerStatusRequest,
    responses(
        (status = 200, description = "Broker withdrawal status updated", body = BrokerWithdrawal),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Broker withdrawal not found"),
        (status = 422, description = "Illegal status transition or insufficient balance")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn update_broker_withdrawal_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<BrokerStatusRequest>,
) -> Result<Json<BrokerWithdrawal>, (StatusCode, String)> {
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

    // Same lifecycle as generic withdrawals: debit on approval, refund
    // on failed, all in one transaction with the audit row.
    let updated = conn.transaction(|conn| {
        let withdrawal = broker_withdrawals::table
            .find(id)
            .select(BrokerWithdrawal::as_select())
            .first::<BrokerWithdrawal>(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Broker withdrawal not found".to_string()))?;

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

        // Predicating the update on the status we just read serializes
        // racing transitions on the withdrawal row; the loser matches
        // zero rows instead of debiting a second time.
        let updated = diesel::update(
            broker_withdrawals::table
                .find(withdrawal.id)
                .filter(broker_withdrawals::status.eq(current.as_str())),
        )
        .set((
            broker_withdrawals::status.eq(next.as_str()),
            broker_withdrawals::reason.eq(req.reason.clone()),
        ))
        .returning(BrokerWithdrawal::as_returning())
        .get_result::<BrokerWithdrawal>(conn)
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

        match next {
            WithdrawalStatus::Approved => {
                ledger::debit_broker(conn, withdrawal.broker_user_id, withdrawal.amount)?;
                diesel::insert_into(broker_transactions::table)
                    .values(NewBrokerTransaction {
                        broker_user_id: withdrawal.broker_user_id,
                        amount: -withdrawal.amount,
                        transaction_type: "withdrawal".to_string(),
                        currency: withdrawal.currency.clone(),
                        status: "completed".to_string(),
                        description: Some(format!(
                            "Withdrawal {} approved, destination {}",
                            withdrawal.id, withdrawal.destination
                        )),
                    })
                    .execute(conn)?;
            }
            WithdrawalStatus::Failed => {
                ledger::credit_broker(conn, withdrawal.broker_user_id, withdrawal.amount)?;
                diesel::insert_into(broker_transactions::table)
                    .values(NewBrokerTransaction {
                        broker_user_id: withdrawal.broker_user_id,
                        amount: withdrawal.amount,
                        transaction_type: "withdrawal_reversal".to_string(),
                        currency: withdrawal.currency.clone(),
                        status: "completed".to_string(),
                        description: Some(format!(
                            "Withdrawal {} failed, funds returned",
                            withdrawal.id
                        )),
                    })
                    .execute(conn)?;
            }
            _ => {}
        }

        Ok::<BrokerWithdrawal, ApiError>(updated)
    })?;

    info!(
        "Broker withdrawal {} moved to {} by admin {}",
        updated.id, updated.status, admin_id
    );
    Ok(Json(updated))
}
