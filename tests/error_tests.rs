mod common;

use diesel::result::Error as DieselError;
use http::StatusCode;
use pixtrade::error::ApiError;
use validator::ValidationErrors;

#[test]
fn test_api_error_to_status_code_mapping() {
    // Database NotFound -> 404
    let err = ApiError::Database(DieselError::NotFound);
    let (status, _): (StatusCode, String) = err.into();
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Database other error -> 500 Internal Server Error
    let err = ApiError::Database(DieselError::QueryBuilderError("broken".into()));
    let (status, _): (StatusCode, String) = err.into();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // Validation error -> 422 Unprocessable Entity
    let err = ApiError::Validation(ValidationErrors::new());
    let (status, _): (StatusCode, String) = err.into();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Auth error -> 401 Unauthorized
    let err = ApiError::Auth("Token expired".to_string());
    let (status, _): (StatusCode, String) = err.into();
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Forbidden -> 403
    let err = ApiError::Forbidden("Admin access required".to_string());
    let (status, _): (StatusCode, String) = err.into();
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Database connection error -> 500 Internal Server Error
    let err = ApiError::DatabaseConnection("Pool timeout".to_string());
    let (status, msg): (StatusCode, String) = err.into();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(msg.contains("Database connection error"));
}

#[test]
fn test_balance_and_pin_failures_are_unprocessable() {
    let (status, msg): (StatusCode, String) = ApiError::InsufficientBalance.into();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(msg, "Insufficient balance");

    let (status, msg): (StatusCode, String) = ApiError::InvalidPin.into();
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(msg, "Invalid transaction PIN");
}

#[test]
fn test_api_error_display() {
    let err = ApiError::Auth("Unauthorized access".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Authentication error"));
    assert!(display.contains("Unauthorized access"));

    let err = ApiError::NotFound("Wallet not found".to_string());
    assert!(format!("{}", err).contains("Wallet not found"));
}
