use crate::handlers::{
    admin::{
        __path_admin_statistics, __path_credit_user, __path_deduct_user, __path_delete_user,
        __path_list_all_wallets, __path_list_users, __path_update_user_status,
    },
    bank_accounts::{
        __path_bank_account_balance, __path_create_bank_account, __path_delete_bank_account,
        __path_get_bank_account, __path_list_bank_accounts, __path_update_bank_account,
    },
    broker_transfers::{
        __path_create_broker_transfer, __path_get_broker_transfer, __path_list_broker_transfers,
    },
    broker_users::{
        __path_approve_broker_kyc, __path_credit_broker_user, __path_deduct_broker_user,
        __path_list_broker_users, __path_reject_broker_kyc,
    },
    broker_withdrawals::{
        __path_create_broker_withdrawal, __path_get_broker_withdrawal,
        __path_list_broker_withdrawals, __path_update_broker_withdrawal_status,
        __path_verify_broker_pin,
    },
    cards::{
        __path_create_card, __path_delete_card, __path_get_card, __path_list_all_cards,
        __path_list_cards, __path_toggle_card_status, __path_update_card,
    },
    current_user::__path_current_user_details,
    deposits::{__path_create_deposit, __path_get_deposit, __path_list_deposits},
    health::__path_health_check,
    kyc::{
        __path_approve_kyc, __path_delete_kyc, __path_get_kyc_submission,
        __path_list_kyc_submissions, __path_reject_kyc, __path_submit_kyc,
    },
    login::__path_login,
    logout::__path_logout,
    register::__path_register,
    transactions::{__path_get_transaction, __path_list_transactions},
    wallets::{
        __path_create_wallet, __path_get_wallet, __path_list_wallets, __path_wallet_balance,
    },
    withdrawals::{
        __path_create_withdrawal, __path_get_withdrawal, __path_list_withdrawals,
        __path_update_withdrawal_status, __path_verify_withdrawal_pin,
    },
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        register, login, logout, current_user_details, health_check,
        list_wallets, create_wallet, get_wallet, wallet_balance,
        list_bank_accounts, create_bank_account, get_bank_account,
        update_bank_account, delete_bank_account, bank_account_balance,
        list_cards, create_card, get_card, update_card,
        toggle_card_status, delete_card, list_all_cards,
        list_deposits, create_deposit, get_deposit,
        list_transactions, get_transaction,
        list_withdrawals, create_withdrawal, get_withdrawal,
        verify_withdrawal_pin, update_withdrawal_status,
        submit_kyc, list_kyc_submissions, get_kyc_submission,
        approve_kyc, reject_kyc, delete_kyc,
        admin_statistics, credit_user, deduct_user, list_users,
        list_all_wallets, update_user_status, delete_user,
        list_broker_users, credit_broker_user, deduct_broker_user,
        approve_broker_kyc, reject_broker_kyc,
        list_broker_withdrawals, create_broker_withdrawal, get_broker_withdrawal,
        verify_broker_pin, update_broker_withdrawal_status,
        list_broker_transfers, create_broker_transfer, get_broker_transfer
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Wallet", description = "Wallet and bank account endpoints"),
        (name = "Ledger", description = "Deposits, withdrawals and transactions"),
        (name = "KYC", description = "Identity verification workflow"),
        (name = "Admin", description = "Administrative operations"),
        (name = "Broker", description = "Broker account operations"),
        (name = "Cards", description = "Card issuance and management")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
