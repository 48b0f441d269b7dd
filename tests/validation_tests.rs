mod common;

use pixtrade::handlers::cards::CardRequest;
use pixtrade::handlers::deposits::DepositRequest;
use pixtrade::handlers::register::RegisterRequest;
use pixtrade::handlers::wallets::CreateWalletRequest;
use pixtrade::handlers::withdrawals::WithdrawalRequest;
use serde_json::json;
use validator::Validate;

#[test]
fn test_register_request_validation() {
    let valid: RegisterRequest = serde_json::from_value(json!({
        "name": "Jordan Doe",
        "email": "jordan@example.com",
        "password": "Password1",
        "account_type": "banking",
        "transaction_pin": "1234"
    }))
    .unwrap();
    assert!(valid.validate().is_ok());

    let bad_email: RegisterRequest = serde_json::from_value(json!({
        "name": "Jordan Doe",
        "email": "not-an-email",
        "password": "Password1",
        "account_type": "banking"
    }))
    .unwrap();
    assert!(bad_email.validate().is_err());

    let weak_password: RegisterRequest = serde_json::from_value(json!({
        "name": "Jordan Doe",
        "email": "jordan@example.com",
        "password": "password",
        "account_type": "banking"
    }))
    .unwrap();
    assert!(weak_password.validate().is_err());
}

#[test]
fn test_withdrawal_request_validation() {
    let valid: WithdrawalRequest = serde_json::from_value(json!({
        "wallet_id": "a9a0dcc0-7b74-4d4b-8bb0-2e9f36cf2c0f",
        "amount": 25.00,
        "destination": "GB29NWBK60161331926819",
        "transaction_pin": "1234"
    }))
    .unwrap();
    assert!(valid.validate().is_ok());

    let zero_amount: WithdrawalRequest = serde_json::from_value(json!({
        "wallet_id": "a9a0dcc0-7b74-4d4b-8bb0-2e9f36cf2c0f",
        "amount": 0.0,
        "destination": "GB29NWBK60161331926819",
        "transaction_pin": "1234"
    }))
    .unwrap();
    assert!(zero_amount.validate().is_err());

    let bad_pin: WithdrawalRequest = serde_json::from_value(json!({
        "wallet_id": "a9a0dcc0-7b74-4d4b-8bb0-2e9f36cf2c0f",
        "amount": 25.00,
        "destination": "GB29NWBK60161331926819",
        "transaction_pin": "12ab"
    }))
    .unwrap();
    assert!(bad_pin.validate().is_err());
}

#[test]
fn test_wallet_currency_validation() {
    let valid: CreateWalletRequest = serde_json::from_value(json!({"currency": "EUR"})).unwrap();
    assert!(valid.validate().is_ok());

    let unknown: CreateWalletRequest = serde_json::from_value(json!({"currency": "XYZ"})).unwrap();
    assert!(unknown.validate().is_err());

    // Lowercase is rejected; handlers uppercase before persisting
    let lowercase: CreateWalletRequest =
        serde_json::from_value(json!({"currency": "usd"})).unwrap();
    assert!(lowercase.validate().is_err());
}

#[test]
fn test_deposit_request_validation() {
    let valid: DepositRequest = serde_json::from_value(json!({
        "wallet_id": "a9a0dcc0-7b74-4d4b-8bb0-2e9f36cf2c0f",
        "amount": 100.0,
        "currency": "USD",
        "payment_method": "card"
    }))
    .unwrap();
    assert!(valid.validate().is_ok());

    let negative: DepositRequest = serde_json::from_value(json!({
        "wallet_id": "a9a0dcc0-7b74-4d4b-8bb0-2e9f36cf2c0f",
        "amount": -5.0,
        "currency": "USD",
        "payment_method": "card"
    }))
    .unwrap();
    assert!(negative.validate().is_err());
}

#[test]
fn test_card_request_validation() {
    let valid: CardRequest = serde_json::from_value(json!({
        "bank_account_id": "a9a0dcc0-7b74-4d4b-8bb0-2e9f36cf2c0f",
        "card_type": "debit",
        "daily_limit": 500.0,
        "monthly_limit": 10_000.0
    }))
    .unwrap();
    assert!(valid.validate().is_ok());

    let negative_limit: CardRequest = serde_json::from_value(json!({
        "bank_account_id": "a9a0dcc0-7b74-4d4b-8bb0-2e9f36cf2c0f",
        "card_type": "credit",
        "daily_limit": -1.0,
        "monthly_limit": 0.0
    }))
    .unwrap();
    assert!(negative_limit.validate().is_err());
}
