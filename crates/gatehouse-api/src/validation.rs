//! Request shape checks. The lifecycle engine trusts its inputs; anything
//! malformed is turned away here with a 400.

use crate::error::ApiError;

pub const DEFAULT_ACTION_BY: &str = "admin";
pub const DEFAULT_EXTENSION_DAYS: u32 = 3;

const ANDROID_ID_LEN: std::ops::RangeInclusive<usize> = 10..=100;
const MAX_NOTES_LEN: usize = 500;
const MAX_ACTION_BY_LEN: usize = 255;
const EXTENSION_DAYS: std::ops::RangeInclusive<u32> = 1..=365;

pub fn android_id(raw: &str) -> Result<String, ApiError> {
    let len = raw.chars().count();
    if len < *ANDROID_ID_LEN.start() {
        return Err(ApiError::Validation(
            "Android ID must be at least 10 characters long".into(),
        ));
    }
    if len > *ANDROID_ID_LEN.end() {
        return Err(ApiError::Validation(
            "Android ID must not exceed 100 characters".into(),
        ));
    }
    Ok(raw.to_string())
}

/// Loose address check: one `@`, non-empty local part, dotted domain.
pub fn email(raw: &str) -> Result<String, ApiError> {
    let invalid = || ApiError::Validation("Please provide a valid email address".into());
    let trimmed = raw.trim();

    let (local, domain) = trimmed.split_once('@').ok_or_else(invalid)?;
    let domain_ok = !domain.contains('@')
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.');

    if local.is_empty() || !domain_ok || trimmed.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(trimmed.to_string())
}

pub fn notes(raw: Option<String>) -> Result<Option<String>, ApiError> {
    match raw {
        Some(n) if n.chars().count() > MAX_NOTES_LEN => Err(ApiError::Validation(
            "notes must not exceed 500 characters".into(),
        )),
        other => Ok(other),
    }
}

pub fn action_by(raw: Option<String>) -> Result<String, ApiError> {
    let actor = raw.unwrap_or_else(|| DEFAULT_ACTION_BY.to_string());
    if actor.trim().is_empty() {
        return Err(ApiError::Validation("actionBy must not be empty".into()));
    }
    if actor.chars().count() > MAX_ACTION_BY_LEN {
        return Err(ApiError::Validation(
            "actionBy must not exceed 255 characters".into(),
        ));
    }
    Ok(actor)
}

pub fn additional_days(raw: Option<u32>) -> Result<u32, ApiError> {
    let days = raw.unwrap_or(DEFAULT_EXTENSION_DAYS);
    if !EXTENSION_DAYS.contains(&days) {
        return Err(ApiError::Validation(
            "additionalDays must be between 1 and 365".into(),
        ));
    }
    Ok(days)
}
