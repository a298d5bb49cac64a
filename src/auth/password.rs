/// Password Hashing and Credential Verification
///
/// bcrypt hashing for provisioning, and the credential check used at login.

use bcrypt::{hash, verify, DEFAULT_COST};
use lazy_static::lazy_static;

use crate::accounts::{Account, AccountRepository};
use crate::error::{AppError, AuthError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 72; // bcrypt ignores anything beyond 72 bytes

lazy_static! {
    // Verified against when the email is unknown so both failure paths pay
    // for one bcrypt comparison.
    static ref DUMMY_PASSWORD_HASH: Option<String> =
        hash("dummy-password-for-timing", DEFAULT_COST).ok();
}

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if:
/// - Password fails validation (too short, weak, etc.)
/// - Bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_strength(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// bcrypt compares digests in constant time.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Check an email/password pair against the stored account.
///
/// Unknown email, inactive account and wrong password all fail with the same
/// `AuthError::InvalidCredentials`.
pub async fn verify_credentials(
    accounts: &dyn AccountRepository,
    email: &str,
    password: &str,
) -> Result<Account, AppError> {
    let account = match accounts.find_by_email(email).await? {
        Some(account) => account,
        None => {
            if let Some(dummy) = DUMMY_PASSWORD_HASH.as_ref() {
                let _ = verify(password, dummy);
            }
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let password_valid = verify_password(password, &account.password_hash)?;
    if !password_valid || !account.is_active {
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(account)
}

/// Validate password strength requirements
///
/// Requirements:
/// - 8 to 72 characters
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )));
    }

    Ok(())
}
