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

use crate::config::security_config::{caller_id, require_admin, Claims};
use crate::error::ApiError;
use crate::ledger::cents_from_amount;
use crate::models::models::{AppState, BrokerTransfer, BrokerUser, NewBrokerTransfer, StatusFilter};
use crate::schema::{broker_transfers, broker_users};
use crate::utility::{validate_pin, verify_pin};

#[derive(Deserialize, ToSchema, Validate)]
pub struct BrokerTransferRequest {
    pub broker_user_id: Uuid,
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,
    #[validate(length(min = 1, max = 255))]
    pub bank_name: String,
    #[validate(length(min = 1, max = 255))]
    pub account_name: String,
    #[validate(length(min = 4, max = 34, message = "Invalid account number"))]
    pub account_number: String,
    pub routing_number: Option<String>,
    pub bank_address: Option<String>,
    #[validate(custom(function = "validate_pin"))]
    pub pin: String,
}

#[utoipa::path(
    get,
    path = "/api/admin/broker-transfers",
    responses(
        (status = 200, description = "Broker bank transfers", body = [BrokerTransfer]),
        (status = 403, description = "Admin only")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn list_broker_transfers(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<BrokerTransfer>>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let mut query = broker_transfers::table.into_boxed();
    if let Some(status) = &filter.status {
        query = query.filter(broker_transfers::status.eq(status));
    }

    let rows = query
        .order(broker_transfers::created_at.desc())
        .select(BrokerTransfer::as_select())
        .load::<BrokerTransfer>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/admin/broker-transfers",
    request_body = BrokerTransferRequest,
    responses(
        (status = 201, description = "Bank transfer submitted", body = BrokerTransfer),
        (status = 403, description = "Invalid PIN"),
        (status = 404, description = "Broker user not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn create_broker_transfer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BrokerTransferRequest>,
) -> Result<(StatusCode, Json<BrokerTransfer>), (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let caller = caller_id(&claims)?;
    let amount_cents = cents_from_amount(req.amount)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let broker = broker_users::table
        .find(req.broker_user_id)
        .select(BrokerUser::as_select())
        .first::<BrokerUser>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Broker user not found".to_string()))?;

    if verify_pin(&req.pin, broker.pin_hash.as_deref()).is_err() {
        return Err(ApiError::Forbidden("Invalid PIN".to_string()).into());
    }

    // Transfer requests only record payout instructions. Settlement
    // happens outside this service, so no funds move here and the row
    // stays pending until an operator reconciles it.
    let transfer = diesel::insert_into(broker_transfers::table)
        .values(NewBrokerTransfer {
            broker_user_id: broker.id,
            amount: amount_cents,
            bank_name: req.bank_name,
            account_name: req.account_name,
            account_number: req.account_number,
            routing_number: req.routing_number,
            bank_address: req.bank_address,
            status: "pending".to_string(),
        })
        .returning(BrokerTransfer::as_returning())
        .get_result::<BrokerTransfer>(conn)
        .map_err(ApiError::Database)?;

    info!(
        "Broker transfer {} created for broker {} by {}",
        transfer.id, broker.id, caller
    );
    Ok((StatusCode::CREATED, Json(transfer)))
}

#[utoipa::path(
    get,
    path = "/api/admin/broker-transfers/{id}",
    params(("id" = Uuid, Path, description = "Broker transfer id")),
    responses(
        (status = 200, description = "Broker transfer details", body = BrokerTransfer),
        (status = 404, description = "Broker transfer not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn get_broker_transfer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BrokerTransfer>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let transfer = broker_transfers::table
        .find(id)
        .select(BrokerTransfer::as_select())
        .first::<BrokerTransfer>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Broker transfer not found".to_string()))?;

    Ok(Json(transfer))
}
