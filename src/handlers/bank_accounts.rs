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

use crate::config::security_config::{caller_id, load_user, Claims};
use crate::error::ApiError;
use crate::handlers::wallets::SUPPORTED_CURRENCIES;
use crate::models::models::{AppState, BankAccount, MessageResponse, NewBankAccount, StatusFilter};
use crate::schema::bank_accounts;

#[derive(Deserialize, ToSchema, Validate)]
pub struct CreateBankAccountRequest {
    #[validate(length(min = 1, max = 255))]
    pub account_name: String,
    /// checking, savings or investment
    pub account_type: String,
    #[validate(regex(path = "SUPPORTED_CURRENCIES", message = "Invalid currency"))]
    pub currency: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateBankAccountRequest {
    pub account_name: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AccountBalanceResponse {
    pub balance: i64,
    pub currency: String,
}

const ACCOUNT_TYPES: &[&str] = &["checking", "savings", "investment"];

fn authorized_account(
    conn: &mut PgConnection,
    account_id: Uuid,
    user_id: Uuid,
) -> Result<BankAccount, ApiError> {
    let account = bank_accounts::table
        .find(account_id)
        .select(BankAccount::as_select())
        .first::<BankAccount>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Bank account not found".to_string()))?;

    if account.user_id != user_id {
        let caller = load_user(conn, user_id)?;
        if !caller.is_admin {
            return Err(ApiError::Forbidden(
                "You do not have access to this bank account".to_string(),
            ));
        }
    }
    Ok(account)
}

#[utoipa::path(
    get,
    path = "/api/bank-accounts",
    responses(
        (status = 200, description = "Caller's bank accounts", body = [BankAccount]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn list_bank_accounts(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<BankAccount>>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let mut query = bank_accounts::table
        .filter(bank_accounts::user_id.eq(user_id))
        .into_boxed();
    if let Some(status) = &filter.status {
        query = query.filter(bank_accounts::status.eq(status));
    }

    let rows = query
        .order(bank_accounts::created_at.desc())
        .select(BankAccount::as_select())
        .load::<BankAccount>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/bank-accounts",
    request_body = CreateBankAccountRequest,
    responses(
        (status = 201, description = "Bank account created", body = BankAccount),
        (status = 422, description = "Validation error")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn create_bank_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBankAccountRequest>,
) -> Result<(StatusCode, Json<BankAccount>), (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    if !ACCOUNT_TYPES.contains(&req.account_type.as_str()) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "account_type must be checking, savings or investment".to_string(),
        ));
    }
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let account = diesel::insert_into(bank_accounts::table)
        .values(NewBankAccount {
            user_id,
            account_name: req.account_name,
            account_type: req.account_type,
            balance: 0,
            currency: req.currency.to_uppercase(),
            status: "active".to_string(),
        })
        .returning(BankAccount::as_returning())
        .get_result::<BankAccount>(conn)
        .map_err(ApiError::Database)?;

    info!("Created bank account {} for user {}", account.id, user_id);
    Ok((StatusCode::CREATED, Json(account)))
}

#[utoipa::path(
    get,
    path = "/api/bank-accounts/{id}",
    params(("id" = Uuid, Path, description = "Bank account id")),
    responses(
        (status = 200, description = "Bank account details", body = BankAccount),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Bank account not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn get_bank_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BankAccount>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let account = authorized_account(conn, id, user_id)?;
    Ok(Json(account))
}

#[utoipa::path(
    put,
    path = "/api/bank-accounts/{id}",
    params(("id" = Uuid, Path, description = "Bank account id")),
    request_body = UpdateBankAccountRequest,
    responses(
        (status = 200, description = "Bank account updated", body = BankAccount),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Bank account not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn update_bank_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBankAccountRequest>,
) -> Result<Json<BankAccount>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let account = authorized_account(conn, id, user_id)?;

    if let Some(status) = &req.status {
        if status != "active" && status != "inactive" {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                "status must be active or inactive".to_string(),
            ));
        }
    }

    let updated = diesel::update(bank_accounts::table.find(account.id))
        .set((
            req.account_name
                .map(|n| bank_accounts::account_name.eq(n))
                .unwrap_or_else(|| bank_accounts::account_name.eq(account.account_name.clone())),
            req.status
                .map(|s| bank_accounts::status.eq(s))
                .unwrap_or_else(|| bank_accounts::status.eq(account.status.clone())),
        ))
        .returning(BankAccount::as_returning())
        .get_result::<BankAccount>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/bank-accounts/{id}",
    params(("id" = Uuid, Path, description = "Bank account id")),
    responses(
        (status = 200, description = "Bank account deleted", body = MessageResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Bank account not found"),
        (status = 422, description = "Account still holds funds")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn delete_bank_account(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let account = authorized_account(conn, id, user_id)?;
    if account.balance != 0 {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Cannot delete an account that still holds funds".to_string(),
        ));
    }

    diesel::delete(bank_accounts::table.find(account.id))
        .execute(conn)
        .map_err(ApiError::Database)?;

    info!("Deleted bank account {} for user {}", id, user_id);
    Ok(Json(MessageResponse::new("Bank account deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/api/bank-accounts/{id}/balance",
    params(("id" = Uuid, Path, description = "Bank account id")),
    responses(
        (status = 200, description = "Balance in minor units", body = AccountBalanceResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Bank account not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn bank_account_balance(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountBalanceResponse>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let account = authorized_account(conn, id, user_id)?;
    Ok(Json(AccountBalanceResponse {
        balance: account.balance,
        currency: account.currency,
    }))
}
