use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::security_config::{caller_id, load_user, Claims};
use crate::error::ApiError;
use crate::models::models::{AppState, Transaction};
use crate::schema::transactions;

#[derive(Deserialize, ToSchema)]
pub struct TransactionFilter {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/transactions",
    responses(
        (status = 200, description = "Caller's transactions, newest first", body = [Transaction]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Ledger"
)]
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let mut query = transactions::table
        .filter(transactions::user_id.eq(user_id))
        .into_boxed();
    if let Some(tx_type) = &filter.transaction_type {
        query = query.filter(transactions::transaction_type.eq(tx_type));
    }
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
    get,
    path = "/api/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction details", body = Transaction),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Transaction not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Ledger"
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let tx = transactions::table
        .find(id)
        .select(Transaction::as_select())
        .first::<Transaction>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Transaction not found".to_string()))?;

    if tx.user_id != user_id {
        let caller = load_user(conn, user_id)?;
        if !caller.is_admin {
            return Err(ApiError::Forbidden(
                "You do not have access to this transaction".to_string(),
            )
            .into());
        }
    }

    Ok(Json(tx))
}
