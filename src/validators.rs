/// Input validators
///
/// One explicit validation function per input field. Each returns the
/// normalized value or a `ValidationError` naming the field.
/// 1. Login: email shape and length limits
/// 2. Expenses: description, amount, category, dates
/// 3. Search queries

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;
const MAX_PASSWORD_INPUT_LENGTH: usize = 1024;
pub const MAX_DESCRIPTION_LENGTH: usize = 300;
pub const MAX_CATEGORY_LENGTH: usize = 50;
pub const DEFAULT_CATEGORY: &str = "other";
/// NUMERIC(10, 2) upper bound
const MAX_AMOUNT: f64 = 100_000_000.0;
const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validates an email address and returns it trimmed.
/// Case is preserved: accounts are looked up exactly as stored.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Login passwords are only checked for presence and a sane upper bound;
/// strength rules apply when a password is set, not when it is presented.
pub fn is_present_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }
    if password.len() > MAX_PASSWORD_INPUT_LENGTH {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_INPUT_LENGTH));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<String, ValidationError> {
    let trimmed = description.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("description".to_string()));
    }

    if trimmed.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ValidationError::TooLong("description".to_string(), MAX_DESCRIPTION_LENGTH));
    }

    if has_control_characters(trimmed) {
        return Err(ValidationError::SuspiciousContent("description".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates an amount and renders it with exactly two decimals.
pub fn validate_amount(amount: f64) -> Result<String, ValidationError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::OutOfRange("amount must be > 0".to_string()));
    }

    let too_large = || {
        ValidationError::OutOfRange(format!("amount must be < {}", MAX_AMOUNT as i64))
    };
    if amount >= MAX_AMOUNT {
        return Err(too_large());
    }

    // Bounds apply to the stored value, after rounding to cents
    let cents = (amount * 100.0).round() as i64;
    if cents == 0 {
        return Err(ValidationError::OutOfRange("amount must be > 0".to_string()));
    }
    if cents >= MAX_AMOUNT_CENTS {
        return Err(too_large());
    }

    Ok(crate::expenses::format_cents(cents))
}

/// Validates a category. A missing category falls back to `other`.
pub fn validate_category(category: Option<&str>) -> Result<String, ValidationError> {
    let trimmed = match category.map(str::trim) {
        None => return Ok(DEFAULT_CATEGORY.to_string()),
        Some(c) => c,
    };

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("category".to_string()));
    }

    if trimmed.chars().count() > MAX_CATEGORY_LENGTH {
        return Err(ValidationError::TooLong("category".to_string(), MAX_CATEGORY_LENGTH));
    }

    if has_control_characters(trimmed) {
        return Err(ValidationError::SuspiciousContent("category".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date_time(field: &str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    parse_date(field, trimmed).map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Like `parse_date_time`, but a bare date means the end of that day, so a
/// date-only upper bound includes the whole day.
pub fn parse_upper_bound(field: &str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = parse_date(field, trimmed)?;
    let end_of_day = date
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .ok_or_else(|| ValidationError::InvalidFormat(field.to_string()))?;
    Ok(Utc.from_utc_datetime(&end_of_day))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidFormat(field.to_string()))
}

/// Normalizes an optional free-text filter: blank means absent.
pub fn optional_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A search query must contain something other than whitespace.
pub fn validate_search_query(query: Option<&str>) -> Result<String, ValidationError> {
    optional_filter(query).ok_or_else(|| ValidationError::EmptyField("query".to_string()))
}

fn has_control_characters(value: &str) -> bool {
    value.chars().any(|c| c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_valid_email() {
        assert_eq!(is_valid_email("  user@example.com ").unwrap(), "user@example.com");
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_email_case_is_preserved() {
        assert_eq!(is_valid_email("Admin@MyApp.com").unwrap(), "Admin@MyApp.com");
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("").is_err());
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());
    }

    #[test]
    fn test_password_presence() {
        assert!(is_present_password("").is_err());
        assert!(is_present_password("x").is_ok());
        assert!(is_present_password(&"x".repeat(2000)).is_err());
    }

    #[test]
    fn test_description() {
        assert_eq!(validate_description("  Café Starbucks ").unwrap(), "Café Starbucks");
        assert!(validate_description("   ").is_err());
        assert!(validate_description(&"é".repeat(300)).is_ok());
        assert!(validate_description(&"a".repeat(301)).is_err());
        assert!(validate_description("line\0break").is_err());
        // Punctuation is ordinary content
        assert!(validate_description("Lunch; coffee -- tip").is_ok());
    }

    #[test]
    fn test_amount() {
        assert_eq!(validate_amount(120.5).unwrap(), "120.50");
        assert_eq!(validate_amount(0.1 + 0.2).unwrap(), "0.30");
        assert_eq!(validate_amount(140.0).unwrap(), "140.00");
        assert!(validate_amount(0.0).is_err());
        assert!(validate_amount(-5.0).is_err());
        assert!(validate_amount(0.001).is_err());
        assert!(validate_amount(f64::NAN).is_err());
        assert!(validate_amount(100_000_000.0).is_err());
    }

    #[test]
    fn test_amount_rounding_up_to_limit_is_rejected() {
        assert_eq!(validate_amount(99_999_999.99).unwrap(), "99999999.99");
        assert!(matches!(
            validate_amount(99_999_999.996),
            Err(ValidationError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_category() {
        assert_eq!(validate_category(None).unwrap(), "other");
        assert_eq!(validate_category(Some(" food ")).unwrap(), "food");
        assert!(validate_category(Some("  ")).is_err());
        assert!(validate_category(Some(&"c".repeat(51))).is_err());
    }

    #[test]
    fn test_parse_date_time() {
        let dt = parse_date_time("date", "2026-01-14T10:30:00.000Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-01-14T10:30:00+00:00");

        let midnight = parse_date_time("date", "2026-01-14").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2026-01-14T00:00:00+00:00");

        assert_eq!(
            parse_date_time("dateFrom", "14/01/2026"),
            Err(ValidationError::InvalidFormat("dateFrom".to_string()))
        );
    }

    #[test]
    fn test_upper_bound_covers_whole_day() {
        let end = parse_upper_bound("dateTo", "2026-01-31").unwrap();
        assert_eq!(end.day(), 31);
        assert!(end > parse_date_time("date", "2026-01-31T23:59:59Z").unwrap());
        assert!(end < parse_date_time("date", "2026-02-01").unwrap());
    }

    #[test]
    fn test_search_query() {
        assert_eq!(validate_search_query(Some(" café ")).unwrap(), "café");
        assert!(validate_search_query(Some("   ")).is_err());
        assert!(validate_search_query(None).is_err());
    }

    #[test]
    fn test_optional_filter() {
        assert_eq!(optional_filter(Some(" food ")), Some("food".to_string()));
        assert_eq!(optional_filter(Some("")), None);
        assert_eq!(optional_filter(None), None);
    }
}
