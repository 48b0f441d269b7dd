use axum::{
    extract::{Extension, Path, State},
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
use crate::ledger::{self, cents_from_amount};
use crate::models::models::{AppState, BrokerUser, MessageResponse, NewBrokerTransaction};
use crate::schema::{broker_transactions, broker_users};

#[derive(Deserialize, ToSchema, Validate)]
pub struct BrokerAdjustRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(range(min = 0.01, message = "Amount must be positive"))]
    pub amount: f64,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct BrokerRejectRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: Option<String>,
}

fn broker_by_email(conn: &mut PgConnection, email: &str) -> Result<BrokerUser, ApiError> {
    broker_users::table
        .filter(broker_users::email.eq(email))
        .select(BrokerUser::as_select())
        .first::<BrokerUser>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Broker user not found".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/admin/broker-users",
    responses(
        (status = 200, description = "All broker users"),
        (status = 403, description = "Admin only")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn list_broker_users(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<BrokerUser>>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let rows = broker_users::table
        .order(broker_users::created_at.desc())
        .select(BrokerUser::as_select())
        .load::<BrokerUser>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/admin/broker-users/credit",
    request_body = BrokerAdjustRequest,
    responses(
        (status = 200, description = "Broker user credited", body = MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Broker user not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn credit_broker_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BrokerAdjustRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let admin_id = caller_id(&claims)?;
    let amount_cents = cents_from_amount(req.amount)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    conn.transaction(|conn| {
        let broker = broker_by_email(conn, &req.email)?;
        ledger::credit_broker(conn, broker.id, amount_cents)?;
        diesel::insert_into(broker_transactions::table)
            .values(NewBrokerTransaction {
                broker_user_id: broker.id,
                amount: amount_cents,
                transaction_type: "admin_credit".to_string(),
                currency: "USD".to_string(),
                status: "completed".to_string(),
                description: Some(format!("Administrative credit by {}", admin_id)),
            })
            .execute(conn)?;
        Ok::<(), ApiError>(())
    })?;

    info!(
        "Admin {} credited {} cents to broker {}",
        admin_id, amount_cents, req.email
    );
    Ok(Json(MessageResponse::new("Broker user credited successfully")))
}

#[utoipa::path(
    post,
    path = "/api/admin/broker-users/deduct",
    request_body = BrokerAdjustRequest,
    responses(
        (status = 200, description = "Broker user debited", body = MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Broker user not found"),
        (status = 422, description = "Insufficient balance")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn deduct_broker_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BrokerAdjustRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let admin_id = caller_id(&claims)?;
    let amount_cents = cents_from_amount(req.amount)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    conn.transaction(|conn| {
        let broker = broker_by_email(conn, &req.email)?;
        ledger::debit_broker(conn, broker.id, amount_cents)?;
        diesel::insert_into(broker_transactions::table)
            .values(NewBrokerTransaction {
                broker_user_id: broker.id,
                amount: -amount_cents,
                transaction_type: "admin_debit".to_string(),
                currency: "USD".to_string(),
                status: "completed".to_string(),
                description: Some(format!("Administrative debit by {}", admin_id)),
            })
            .execute(conn)?;
        Ok::<(), ApiError>(())
    })?;

    info!(
        "Admin {} debited {} cents from broker {}",
        admin_id, amount_cents, req.email
    );
    Ok(Json(MessageResponse::new("Broker user debited successfully")))
}

#[utoipa::path(
    post,
    path = "/api/admin/broker-users/{id}/kyc/approve",
    params(("id" = Uuid, Path, description = "Broker user id")),
    responses(
        (status = 200, description = "Broker KYC approved", body = MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Broker user not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn approve_broker_kyc(
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

    let updated = diesel::update(broker_users::table.find(id))
        .set(broker_users::kyc_status.eq("approved"))
        .execute(conn)
        .map_err(ApiError::Database)?;
    if updated == 0 {
        return Err(ApiError::NotFound("Broker user not found".to_string()).into());
    }

    info!("Broker {} KYC approved by admin {}", id, admin_id);
    Ok(Json(MessageResponse::new("Broker KYC approved")))
}

#[utoipa::path(
    post,
    path = "/api/admin/broker-users/{id}/kyc/reject",
    params(("id" = Uuid, Path, description = "Broker user id")),
    request_body = BrokerRejectRequest,
    responses(
        (status = 200, description = "Broker KYC rejected", body = MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Broker user not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Broker"
)]
pub async fn reject_broker_kyc(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<BrokerRejectRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let updated = diesel::update(broker_users::table.find(id))
        .set(broker_users::kyc_status.eq("rejected"))
        .execute(conn)
        .map_err(ApiError::Database)?;
    if updated == 0 {
        return Err(ApiError::NotFound("Broker user not found".to_string()).into());
    }

    info!(
        "Broker {} KYC rejected by admin {} ({})",
        id,
        admin_id,
        req.reason.as_deref().unwrap_or("no reason given")
    );
    Ok(Json(MessageResponse::new("Broker KYC rejected")))
}
