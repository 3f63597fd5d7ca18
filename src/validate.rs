//! Input validation for token issuance. Pure functions, no I/O; the pipeline
//! calls them in order identifier → lifetime → grants and stops at the first
//! failure, before any side effect.

use chrono::Duration;

use crate::errors::AppError;
use crate::models::grant::AccessGrant;

const TOKEN_UID_MAX_LEN: usize = 100;

/// Token identifier syntax: 1..=100 chars, leading letter or underscore,
/// then letters, digits, `.`, `-`, `_`.
pub fn token_uid(uid: &str) -> Result<(), AppError> {
    if uid.is_empty() {
        return Err(AppError::InvalidIdentifier(
            "identifier must not be empty".into(),
        ));
    }
    if uid.len() > TOKEN_UID_MAX_LEN {
        return Err(AppError::InvalidIdentifier(format!(
            "identifier must be at most {} characters",
            TOKEN_UID_MAX_LEN
        )));
    }
    match uid.chars().next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => {
            return Err(AppError::InvalidIdentifier(
                "identifier must start with a letter or underscore".into(),
            ))
        }
    }
    if !uid
        .chars()
        .skip(1)
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(AppError::InvalidIdentifier(
            "identifier may only contain letters, digits, '.', '-' and '_'".into(),
        ));
    }
    Ok(())
}

/// Lifetime must be strictly positive and at or below the configured ceiling.
pub fn token_lifetime(lifetime: Duration, max: Duration) -> Result<(), AppError> {
    if lifetime <= Duration::zero() {
        return Err(AppError::InvalidLifetime(
            "lifetime must be positive".into(),
        ));
    }
    if lifetime > max {
        return Err(AppError::InvalidLifetime(format!(
            "lifetime exceeds the maximum of {} hours",
            max.num_hours()
        )));
    }
    Ok(())
}

/// Grants must be non-empty and within the defined permission bits. The
/// reserved full grant is only accepted when the caller-audited
/// `allow_privileged_default` flag is set.
pub fn access_grant(grants: AccessGrant, allow_privileged_default: bool) -> Result<(), AppError> {
    if grants.is_empty() {
        return Err(AppError::InvalidGrant("grant must not be empty".into()));
    }
    if !grants.is_known() {
        return Err(AppError::InvalidGrant(
            "grant contains undefined permission bits".into(),
        ));
    }
    if grants == AccessGrant::ALL && !allow_privileged_default {
        return Err(AppError::InvalidGrant(
            "the full grant is reserved for privileged flows".into(),
        ));
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────
