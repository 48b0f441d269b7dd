use crate::error::ApiError;
use validator::ValidationError;

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let trimmed = password.trim();

    if trimmed.len() < 8 {
        return Err(ValidationError::new(
            "Password must be at least 8 characters long",
        ));
    }

    let has_lowercase = trimmed.chars().any(|c| c.is_ascii_lowercase());
    let has_uppercase = trimmed.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = trimmed.chars().any(|c| c.is_ascii_digit());

    if !(has_lowercase && has_uppercase && has_digit) {
        return Err(ValidationError::new(
            "Password must contain at least one uppercase letter, \
                one lowercase letter, and one digit",
        ));
    }

    Ok(())
}

pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("PIN must be exactly 4 digits"));
    }
    Ok(())
}

pub fn hash_pin(pin: &str) -> Result<String, ApiError> {
    Ok(bcrypt::hash(pin, bcrypt::DEFAULT_COST)?)
}

/// Compare a submitted PIN against a stored bcrypt hash. A missing hash
/// means the account never set a PIN and can authorize nothing.
pub fn verify_pin(pin: &str, pin_hash: Option<&str>) -> Result<(), ApiError> {
    let hash = pin_hash.ok_or(ApiError::InvalidPin)?;
    if bcrypt::verify(pin, hash)? {
        Ok(())
    } else {
        Err(ApiError::InvalidPin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules() {
        assert!(validate_password("Abcdef12").is_ok());
        assert!(validate_password("short1A").is_err());
        assert!(validate_password("alllowercase1").is_err());
        assert!(validate_password("NODIGITSHERE").is_err());
    }

    #[test]
    fn pin_must_be_four_digits() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("12345").is_err());
        assert!(validate_pin("12a4").is_err());
    }

    #[test]
    fn pin_verification_round_trip() {
        let hash = hash_pin("4321").unwrap();
        assert!(verify_pin("4321", Some(&hash)).is_ok());
        assert!(matches!(
            verify_pin("0000", Some(&hash)),
            Err(ApiError::InvalidPin)
        ));
    }

    #[test]
    fn missing_pin_hash_rejects() {
        assert!(matches!(verify_pin("1234", None), Err(ApiError::InvalidPin)));
    }
}
