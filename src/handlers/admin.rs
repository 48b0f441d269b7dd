use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::security_config::{caller_id, require_admin, Claims};
use crate::error::ApiError;
use crate::handlers::wallets::SUPPORTED_CURRENCIES;
use crate::ledger::{self, cents_from_amount};
use crate::models::models::{AppState, MessageResponse, NewTransaction, Wallet};
use crate::schema::{broker_withdrawals, transactions, users, wallets, withdrawals};

#[derive(Deserialize, ToSchema, Validate)]
pub struct AdjustBalanceRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,
    #[validate(regex(path = "SUPPORTED_CURRENCIES", message = "Invalid currency"))]
    pub currency: String,
}

#[derive(Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub total_users: i64,
    pub active_users: i64,
    pub total_balance: i64,
    pub pending_withdrawals: i64,
    pub pending_broker_withdrawals: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct UserFilter {
    pub account_type: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminUserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub account_type: String,
    pub status: String,
    pub kyc_verified: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUserStatusRequest {
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/api/admin/statistics",
    responses(
        (status = 200, description = "Aggregate platform statistics", body = StatisticsResponse),
        (status = 403, description = "Admin only")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn admin_statistics(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<StatisticsResponse>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let total_users: i64 = users::table.count().get_result(conn).map_err(ApiError::Database)?;
    let active_users: i64 = users::table
        .filter(users::status.eq("active"))
        .count()
        .get_result(conn)
        .map_err(ApiError::Database)?;
    // SUM(bigint) is numeric in Postgres; cast back to keep i64 cents.
    let total_balance: Option<i64> = wallets::table
        .select(sql::<Nullable<BigInt>>("SUM(balance)::BIGINT"))
        .get_result(conn)
        .map_err(ApiError::Database)?;
    let pending_withdrawals: i64 = withdrawals::table
        .filter(withdrawals::status.eq("pending"))
        .count()
        .get_result(conn)
        .map_err(ApiError::Database)?;
    let pending_broker_withdrawals: i64 = broker_withdrawals::table
        .filter(broker_withdrawals::status.eq("pending"))
        .count()
        .get_result(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(StatisticsResponse {
        total_users,
        active_users,
        total_balance: total_balance.unwrap_or(0),
        pending_withdrawals,
        pending_broker_withdrawals,
    }))
}

/// Resolve the target of an admin credit/debit: the user's first wallet,
/// matched by currency when one exists.
fn target_wallet(
    conn: &mut PgConnection,
    email: &str,
    currency: &str,
) -> Result<Wallet, ApiError> {
    let user_id: Uuid = users::table
        .filter(users::email.eq(email))
        .select(users::id)
        .first::<Uuid>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let wallet = wallets::table
        .filter(wallets::user_id.eq(user_id))
        .filter(wallets::currency.eq(currency))
        .select(Wallet::as_select())
        .first::<Wallet>(conn)
        .optional()?;

    match wallet {
        Some(w) => Ok(w),
        None => wallets::table
            .filter(wallets::user_id.eq(user_id))
            .order(wallets::created_at.asc())
            .select(Wallet::as_select())
            .first::<Wallet>(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound("User has no wallet".to_string())),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/users/credit",
    request_body = AdjustBalanceRequest,
    responses(
        (status = 200, description = "User credited", body = MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn credit_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AdjustBalanceRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let admin_id = caller_id(&claims)?;
    let amount_cents = cents_from_amount(req.amount)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let currency = req.currency.to_uppercase();
    conn.transaction(|conn| {
        let wallet = target_wallet(conn, &req.email, &currency)?;
        ledger::credit_wallet(conn, wallet.id, amount_cents)?;
        diesel::insert_into(transactions::table)
            .values(NewTransaction {
                user_id: wallet.user_id,
                wallet_id: Some(wallet.id),
                amount: amount_cents,
                transaction_type: "admin_credit".to_string(),
                currency: wallet.currency.clone(),
                status: "completed".to_string(),
                description: Some(format!("Administrative credit by {}", admin_id)),
                metadata: None,
            })
            .execute(conn)?;
        Ok::<(), ApiError>(())
    })?;

    info!(
        "Admin {} credited {} cents to {}",
        admin_id, amount_cents, req.email
    );
    Ok(Json(MessageResponse::new("User credited successfully")))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/deduct",
    request_body = AdjustBalanceRequest,
    responses(
        (status = 200, description = "User debited", body = MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Insufficient balance")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn deduct_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AdjustBalanceRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let admin_id = caller_id(&claims)?;
    let amount_cents = cents_from_amount(req.amount)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let currency = req.currency.to_uppercase();
    conn.transaction(|conn| {
        let wallet = target_wallet(conn, &req.email, &currency)?;
        ledger::debit_wallet(conn, wallet.id, amount_cents)?;
        diesel::insert_into(transactions::table)
            .values(NewTransaction {
                user_id: wallet.user_id,
                wallet_id: Some(wallet.id),
                amount: -amount_cents,
                transaction_type: "admin_debit".to_string(),
                currency: wallet.currency.clone(),
                status: "completed".to_string(),
                description: Some(format!("Administrative debit by {}", admin_id)),
                metadata: None,
            })
            .execute(conn)?;
        Ok::<(), ApiError>(())
    })?;

    info!(
        "Admin {} debited {} cents from {}",
        admin_id, amount_cents, req.email
    );
    Ok(Json(MessageResponse::new("User debited successfully")))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users", body = [AdminUserRow]),
        (status = 403, description = "Admin only")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<AdminUserRow>>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let mut query = users::table.into_boxed();
    if let Some(account_type) = &filter.account_type {
        query = query.filter(users::account_type.eq(account_type));
    }

    let rows = query
        .order(users::created_at.desc())
        .select((
            users::id,
            users::email,
            users::name,
            users::account_type,
            users::status,
            users::kyc_verified,
        ))
        .load::<(Uuid, String, String, String, String, bool)>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(
        rows.into_iter()
            .map(|(id, email, name, account_type, status, kyc_verified)| AdminUserRow {
                id,
                email,
                name,
                account_type,
                status,
                kyc_verified,
            })
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/wallets",
    responses(
        (status = 200, description = "All wallets", body = [Wallet]),
        (status = 403, description = "Admin only")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn list_all_wallets(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Wallet>>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let rows = wallets::table
        .order(wallets::created_at.desc())
        .select(Wallet::as_select())
        .load::<Wallet>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/status",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserStatusRequest,
    responses(
        (status = 200, description = "User status updated", body = MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found"),
        (status = 422, description = "Unknown status")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn update_user_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserStatusRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    if !["active", "pending", "suspended"].contains(&req.status.as_str()) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "status must be active, pending or suspended".to_string(),
        ));
    }

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let updated = diesel::update(users::table.find(id))
        .set(users::status.eq(&req.status))
        .execute(conn)
        .map_err(ApiError::Database)?;
    if updated == 0 {
        return Err(ApiError::NotFound("User not found".to_string()).into());
    }

    info!("Admin {} set user {} status to {}", admin_id, id, req.status);
    Ok(Json(MessageResponse::new("User status updated")))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let deleted = diesel::delete(users::table.find(id))
        .execute(conn)
        .map_err(ApiError::Database)?;
    if deleted == 0 {
        return Err(ApiError::NotFound("User not found".to_string()).into());
    }

    info!("Admin {} deleted user {}", admin_id, id);
    Ok(Json(MessageResponse::new("User deleted")))
}
