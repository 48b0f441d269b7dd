use axum::{middleware, routing, Router};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::security_config::auth_middleware;
use crate::config::swagger_config::ApiDoc;
use crate::handlers::admin::{
    admin_statistics, credit_user, deduct_user, delete_user, list_all_wallets, list_users,
    update_user_status,
};
use crate::handlers::bank_accounts::{
    bank_account_balance, create_bank_account, delete_bank_account, get_bank_account,
    list_bank_accounts, update_bank_account,
};
use crate::handlers::broker_transfers::{
    create_broker_transfer, get_broker_transfer, list_broker_transfers,
};
use crate::handlers::broker_users::{
    approve_broker_kyc, credit_broker_user, deduct_broker_user, list_broker_users,
    reject_broker_kyc,
};
use crate::handlers::broker_withdrawals::{
    create_broker_withdrawal, get_broker_withdrawal, list_broker_withdrawals,
    update_broker_withdrawal_status, verify_broker_pin,
};
use crate::handlers::cards::{
    create_card, delete_card, get_card, list_all_cards, list_cards, toggle_card_status,
    update_card,
};
use crate::handlers::current_user::current_user_details;
use crate::handlers::deposits::{create_deposit, get_deposit, list_deposits};
use crate::handlers::health::health_check;
use crate::handlers::kyc::{
    approve_kyc, delete_kyc, get_kyc_submission, list_kyc_submissions, reject_kyc, submit_kyc,
};
use crate::handlers::login::login;
use crate::handlers::logout::logout;
use crate::handlers::register::register;
use crate::handlers::transactions::{get_transaction, list_transactions};
use crate::handlers::wallets::{create_wallet, get_wallet, list_wallets, wallet_balance};
use crate::handlers::withdrawals::{
    create_withdrawal, get_withdrawal, list_withdrawals, update_withdrawal_status,
    verify_withdrawal_pin,
};
use crate::models::models::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes (no authentication)
    let public_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", routing::get(health_check))
        .route("/api/register", routing::post(register))
        .route("/api/login", routing::post(login));

    // Protected routes (require JWT authentication)
    let protected_router = Router::new()
        .route("/api/logout", routing::post(logout))
        .route("/api/current_user", routing::get(current_user_details))
        .route(
            "/api/wallets",
            routing::get(list_wallets).post(create_wallet),
        )
        .route("/api/wallets/{id}", routing::get(get_wallet))
        .route("/api/wallets/{id}/balance", routing::get(wallet_balance))
        .route(
            "/api/bank-accounts",
            routing::get(list_bank_accounts).post(create_bank_account),
        )
        .route(
            "/api/bank-accounts/{id}",
            routing::get(get_bank_account)
                .put(update_bank_account)
                .delete(delete_bank_account),
        )
        .route(
            "/api/bank-accounts/{id}/balance",
            routing::get(bank_account_balance),
        )
        .route("/api/cards", routing::get(list_cards).post(create_card))
        .route(
            "/api/cards/{id}",
            routing::get(get_card).put(update_card).delete(delete_card),
        )
        .route(
            "/api/cards/{id}/toggle-status",
            routing::post(toggle_card_status),
        )
        .route(
            "/api/deposits",
            routing::get(list_deposits).post(create_deposit),
        )
        .route("/api/deposits/{id}", routing::get(get_deposit))
        .route("/api/transactions", routing::get(list_transactions))
        .route("/api/transactions/{id}", routing::get(get_transaction))
        .route(
            "/api/withdrawals",
            routing::get(list_withdrawals).post(create_withdrawal),
        )
        .route(
            "/api/withdrawals/verify-pin",
            routing::post(verify_withdrawal_pin),
        )
        .route("/api/withdrawals/{id}", routing::get(get_withdrawal))
        .route(
            "/api/withdrawals/{id}/status",
            routing::put(update_withdrawal_status),
        )
        .route("/api/kyc", routing::get(list_kyc_submissions).post(submit_kyc))
        .route(
            "/api/kyc/{id}",
            routing::get(get_kyc_submission).delete(delete_kyc),
        )
        .route("/api/kyc/{id}/approve", routing::post(approve_kyc))
        .route("/api/kyc/{id}/reject", routing::post(reject_kyc))
        .route("/api/admin/statistics", routing::get(admin_statistics))
        .route("/api/admin/users", routing::get(list_users))
        .route("/api/admin/users/credit", routing::post(credit_user))
        .route("/api/admin/users/deduct", routing::post(deduct_user))
        .route(
            "/api/admin/users/{id}/status",
            routing::post(update_user_status),
        )
        .route("/api/admin/users/{id}", routing::delete(delete_user))
        .route("/api/admin/wallets", routing::get(list_all_wallets))
        .route("/api/admin/cards", routing::get(list_all_cards))
        .route("/api/admin/broker-users", routing::get(list_broker_users))
        .route(
            "/api/admin/broker-users/credit",
            routing::post(credit_broker_user),
        )
        .route(
            "/api/admin/broker-users/deduct",
            routing::post(deduct_broker_user),
        )
        .route(
            "/api/admin/broker-users/{id}/kyc/approve",
            routing::post(approve_broker_kyc),
        )
        .route(
            "/api/admin/broker-users/{id}/kyc/reject",
            routing::post(reject_broker_kyc),
        )
        .route(
            "/api/admin/broker-withdrawals",
            routing::get(list_broker_withdrawals).post(create_broker_withdrawal),
        )
        .route(
            "/api/admin/broker-withdrawals/verify-pin",
            routing::post(verify_broker_pin),
        )
        .route(
            "/api/admin/broker-withdrawals/{id}",
            routing::get(get_broker_withdrawal),
        )
        .route(
            "/api/admin/broker-withdrawals/{id}/status",
            routing::put(update_broker_withdrawal_status),
        )
        .route(
            "/api/admin/broker-transfers",
            routing::get(list_broker_transfers).post(create_broker_transfer),
        )
        .route(
            "/api/admin/broker-transfers/{id}",
            routing::get(get_broker_transfer),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_router)
        .merge(protected_router)
        .with_state(state)
}
