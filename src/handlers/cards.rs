use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Datelike;
use diesel::prelude::*;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::security_config::{caller_id, load_user, require_admin, Claims};
use crate::error::ApiError;
use crate::ledger::cents_from_amount;
use crate::models::models::{AppState, Card, MessageResponse, NewCard};
use crate::schema::{bank_accounts, cards};

const CARD_TYPES: &[&str] = &["debit", "credit"];

#[derive(Deserialize, ToSchema, Validate)]
pub struct CardRequest {
    pub bank_account_id: Uuid,
    pub card_type: String,
    #[validate(range(min = 0.0, message = "Daily limit must not be negative"))]
    pub daily_limit: f64,
    #[validate(range(min = 0.0, message = "Monthly limit must not be negative"))]
    pub monthly_limit: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateCardRequest {
    pub status: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CardFilter {
    pub status: Option<String>,
    pub card_type: Option<String>,
}

fn authorized_card(
    conn: &mut PgConnection,
    card_id: Uuid,
    user_id: Uuid,
) -> Result<Card, ApiError> {
    let card = cards::table
        .find(card_id)
        .select(Card::as_select())
        .first::<Card>(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))?;

    if card.user_id != user_id && !load_user(conn, user_id)?.is_admin {
        return Err(ApiError::Forbidden(
            "You do not have access to this card".to_string(),
        ));
    }
    Ok(card)
}

// Spending limits may be zero (no limit set), unlike money movements.
fn limit_cents(amount: f64) -> Result<i64, ApiError> {
    if amount == 0.0 {
        Ok(0)
    } else {
        cents_from_amount(amount)
    }
}

/// Only a masked PAN is ever stored or returned.
fn generate_card_number(card_type: &str) -> String {
    let prefix = match card_type {
        "credit" => "5000",
        _ => "4000",
    };
    let tail: u64 = rand::thread_rng().gen_range(0..10_000);
    format!("{}********{:04}", prefix, tail)
}

#[utoipa::path(
    get,
    path = "/api/cards",
    responses(
        (status = 200, description = "Caller's cards", body = [Card]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<CardFilter>,
) -> Result<Json<Vec<Card>>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let mut query = cards::table
        .filter(cards::user_id.eq(user_id))
        .into_boxed();
    if let Some(status) = &filter.status {
        query = query.filter(cards::status.eq(status));
    }
    if let Some(card_type) = &filter.card_type {
        query = query.filter(cards::card_type.eq(card_type));
    }

    let rows = query
        .order(cards::created_at.desc())
        .select(Card::as_select())
        .load::<Card>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/admin/cards",
    responses(
        (status = 200, description = "All cards", body = [Card]),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn list_all_cards(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<CardFilter>,
) -> Result<Json<Vec<Card>>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let mut query = cards::table.into_boxed();
    if let Some(status) = &filter.status {
        query = query.filter(cards::status.eq(status));
    }
    if let Some(card_type) = &filter.card_type {
        query = query.filter(cards::card_type.eq(card_type));
    }

    let rows = query
        .order(cards::created_at.desc())
        .select(Card::as_select())
        .load::<Card>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/api/cards",
    request_body = CardRequest,
    responses(
        (status = 201, description = "Card application submitted", body = Card),
        (status = 403, description = "Bank account belongs to another user"),
        (status = 404, description = "Bank account not found"),
        (status = 422, description = "Validation error")
    ),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn create_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CardRequest>,
) -> Result<(StatusCode, Json<Card>), (StatusCode, String)> {
    let user_id = caller_id(&claims)?;
    req.validate().map_err(ApiError::Validation)?;

    if !CARD_TYPES.contains(&req.card_type.as_str()) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "card_type must be debit or credit".to_string(),
        ));
    }

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let account_owner = bank_accounts::table
        .find(req.bank_account_id)
        .select(bank_accounts::user_id)
        .first::<Uuid>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Bank account not found".to_string()))?;
    if account_owner != user_id {
        return Err(ApiError::Forbidden(
            "Bank account belongs to another user".to_string(),
        )
        .into());
    }

    let user = load_user(conn, user_id)?;
    let (expiry_month, expiry_year) = {
        let mut rng = rand::thread_rng();
        (
            rng.gen_range(1..=12),
            chrono::Utc::now().year() + rng.gen_range(2..=5),
        )
    };

    let card = diesel::insert_into(cards::table)
        .values(NewCard {
            user_id,
            bank_account_id: req.bank_account_id,
            card_type: req.card_type.clone(),
            card_number: generate_card_number(&req.card_type),
            cardholder_name: user.name,
            expiry_month,
            expiry_year,
            status: "pending".to_string(),
            daily_limit: limit_cents(req.daily_limit)?,
            monthly_limit: limit_cents(req.monthly_limit)?,
        })
        .returning(Card::as_returning())
        .get_result::<Card>(conn)
        .map_err(ApiError::Database)?;

    info!("Card {} requested by user {}", card.id, user_id);
    Ok((StatusCode::CREATED, Json(card)))
}

#[utoipa::path(
    get,
    path = "/api/cards/{id}",
    params(("id" = Uuid, Path, description = "Card id")),
    responses(
        (status = 200, description = "Card details", body = Card),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Card not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn get_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Card>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let card = authorized_card(conn, id, user_id)?;
    Ok(Json(card))
}

#[utoipa::path(
    put,
    path = "/api/cards/{id}",
    params(("id" = Uuid, Path, description = "Card id")),
    request_body = UpdateCardRequest,
    responses(
        (status = 200, description = "Card updated", body = Card),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Card not found"),
        (status = 422, description = "Unknown status")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn update_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCardRequest>,
) -> Result<Json<Card>, (StatusCode, String)> {
    let admin_id = caller_id(&claims)?;

    if !["active", "inactive", "blocked"].contains(&req.status.as_str()) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "status must be active, inactive or blocked".to_string(),
        ));
    }

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    require_admin(conn, admin_id)?;

    let updated = diesel::update(cards::table.find(id))
        .set(cards::status.eq(&req.status))
        .returning(Card::as_returning())
        .get_result::<Card>(conn)
        .optional()
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Card not found".to_string()))?;

    info!("Card {} set to {} by admin {}", id, updated.status, admin_id);
    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/api/cards/{id}/toggle-status",
    params(("id" = Uuid, Path, description = "Card id")),
    responses(
        (status = 200, description = "Card status toggled", body = Card),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Card not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn toggle_card_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Card>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let card = authorized_card(conn, id, user_id)?;
    let next = if card.status == "active" {
        "inactive"
    } else {
        "active"
    };

    let updated = diesel::update(cards::table.find(card.id))
        .set(cards::status.eq(next))
        .returning(Card::as_returning())
        .get_result::<Card>(conn)
        .map_err(ApiError::Database)?;

    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/cards/{id}",
    params(("id" = Uuid, Path, description = "Card id")),
    responses(
        (status = 200, description = "Card deleted", body = MessageResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Card not found")
    ),
    security(("bearerAuth" = [])),
    tag = "Cards"
)]
pub async fn delete_card(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let user_id = caller_id(&claims)?;

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let card = authorized_card(conn, id, user_id)?;
    diesel::delete(cards::table.find(card.id))
        .execute(conn)
        .map_err(ApiError::Database)?;

    info!("Card {} deleted by user {}", id, user_id);
    Ok(Json(MessageResponse::new("Card deleted successfully")))
}
