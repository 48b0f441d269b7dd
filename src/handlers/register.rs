use axum::{extract::State, http::StatusCode, Json};
use bcrypt::hash;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::security_config::create_token;
use crate::error::ApiError;
use crate::models::models::{AppState, NewBankAccount, NewUser, NewWallet};
use crate::utility::{hash_pin, validate_password, validate_pin};

#[derive(Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    /// "broker" or "banking"; immutable after registration.
    pub account_type: String,
    #[validate(custom(function = "validate_pin"))]
    pub transaction_pin: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub token: String,
    pub user_id: String,
    pub email: String,
    pub account_type: String,
}

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Email already exists"),
        (status = 422, description = "Validation error"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), (StatusCode, String)> {
    payload.validate().map_err(|e| {
        error!("Validation error: {}", e);
        ApiError::Validation(e)
    })?;

    if payload.account_type != "broker" && payload.account_type != "banking" {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "account_type must be 'broker' or 'banking'".to_string(),
        ));
    }

    let conn = &mut state.db.get().map_err(|e| {
        error!("Database connection error: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let password_hash = hash(&payload.password, 12).map_err(ApiError::Bcrypt)?;
    let pin_hash = match &payload.transaction_pin {
        Some(pin) => Some(hash_pin(pin)?),
        None => None,
    };

    let email = payload.email.clone();
    let account_type = payload.account_type.clone();

    let user_id: Uuid = conn
        .transaction(|conn| {
            use crate::schema::{bank_accounts, users, wallets};

            let exists: i64 = users::table
                .filter(users::email.eq(&email))
                .count()
                .get_result(conn)?;
            if exists > 0 {
                return Err(diesel::result::Error::RollbackTransaction);
            }

            let usr_id: Uuid = diesel::insert_into(users::table)
                .values(NewUser {
                    email: payload.email,
                    password_hash,
                    name: payload.name,
                    account_type: payload.account_type,
                    status: "active".to_string(),
                    transaction_pin_hash: pin_hash,
                })
                .returning(users::id)
                .get_result(conn)?;

            // Banking accounts start with a default USD wallet and bank
            // account; broker balances live in broker_users.
            if account_type == "banking" {
                diesel::insert_into(wallets::table)
                    .values(NewWallet {
                        user_id: usr_id,
                        balance: 0,
                        currency: "USD".to_string(),
                        status: "active".to_string(),
                    })
                    .execute(conn)?;

                diesel::insert_into(bank_accounts::table)
                    .values(NewBankAccount {
                        user_id: usr_id,
                        account_name: "Main Account".to_string(),
                        account_type: "savings".to_string(),
                        balance: 0,
                        currency: "USD".to_string(),
                        status: "active".to_string(),
                    })
                    .execute(conn)?;
            }

            Ok::<Uuid, diesel::result::Error>(usr_id)
        })
        .map_err(|e| match e {
            diesel::result::Error::RollbackTransaction => {
                (StatusCode::BAD_REQUEST, "Email already exists".to_string())
            }
            _ => {
                error!("Registration failed: {}", e);
                ApiError::Database(e).into()
            }
        })?;

    let token = create_token(&state, &user_id.to_string())?;

    info!("Registered user {} ({})", user_id, account_type);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            token,
            user_id: user_id.to_string(),
            email,
            account_type,
        }),
    ))
}
