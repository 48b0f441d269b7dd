mod common;

use common::create_test_app_state;
use pixtrade::config::security_config::{create_token, verify_token};
use pixtrade::utility::{hash_pin, validate_password, validate_pin, verify_pin};

#[tokio::test]
async fn test_create_and_verify_token() {
    let state = create_test_app_state();
    let user_id = "f3b9a1ce-7c1e-4f5a-9d3e-2b8a6c4d1e0f";

    let token = create_token(&state, user_id).expect("Failed to create token");
    assert!(!token.is_empty());

    let claims = verify_token(&state, &token).expect("Failed to verify token");
    assert_eq!(claims.sub, user_id);
    assert!(claims.exp > claims.iat);
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let state = create_test_app_state();
    let result = verify_token(&state, "invalid.token.here");
    assert!(result.is_err());
}

#[tokio::test]
async fn test_token_with_wrong_secret_rejected() {
    let state = create_test_app_state();
    let token = create_token(&state, "some-user").expect("Failed to create token");

    let mut different_state = (*state).clone();
    different_state.jwt_secret = "different_secret_key_minimum_32_characters_long".to_string();

    let result = verify_token(&std::sync::Arc::new(different_state), &token);
    assert!(result.is_err());
}

#[test]
fn test_password_policy() {
    assert!(validate_password("Password1").is_ok());
    // missing uppercase
    assert!(validate_password("password1").is_err());
    // missing digit
    assert!(validate_password("Passwordx").is_err());
    // too short
    assert!(validate_password("Pw1").is_err());
}

#[test]
fn test_pin_format() {
    assert!(validate_pin("0000").is_ok());
    assert!(validate_pin("1234").is_ok());
    assert!(validate_pin("123").is_err());
    assert!(validate_pin("12345").is_err());
    assert!(validate_pin("12a4").is_err());
}

#[test]
fn test_pin_hash_round_trip() {
    let hash = hash_pin("4321").expect("Failed to hash PIN");
    assert_ne!(hash, "4321");

    assert!(verify_pin("4321", Some(&hash)).is_ok());
    assert!(verify_pin("1234", Some(&hash)).is_err());
}

#[test]
fn test_pin_verify_without_configured_pin_fails() {
    // An account that never set a PIN can never authorize a withdrawal.
    assert!(verify_pin("1234", None).is_err());
}
