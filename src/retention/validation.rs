//! Input validation for purge requests.
//!
//! Table names arrive from operators and CLI arguments. They are checked
//! character by character before any allow-list lookup.

use chrono::{Datelike, NaiveDate};

use super::PurgeError;
use crate::calendar::start_of_year;

/// Length limits for validated fields.
pub mod limits {
    /// Maximum table name length.
    pub const MAX_TABLE_NAME_LENGTH: usize = 64;
}

/// Error constants for validation failures.
pub mod errmsg {
    pub const TABLE_NAME_EMPTY: &str = "table name cannot be empty";
    pub const TABLE_NAME_TOO_LONG: &str = "table name exceeds maximum length";
    pub const TABLE_NAME_INVALID_START: &str = "table name must start with lowercase letter";
    pub const TABLE_NAME_INVALID_CHARS: &str =
        "table name contains invalid characters (allowed: a-z, 0-9, _)";
}

/// Trim and lowercase a requested table name.
pub fn normalize_table_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Validate a normalized table name.
///
/// Rules:
/// - Must not be empty
/// - Maximum 64 characters
/// - Must start with lowercase letter (a-z)
/// - May contain: lowercase letters (a-z), digits (0-9), underscore (_)
pub fn validate_table_name(name: &str) -> Result<(), PurgeError> {
    let invalid = |reason: String| PurgeError::InvalidTableName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid(errmsg::TABLE_NAME_EMPTY.to_string()));
    }
    if name.len() > limits::MAX_TABLE_NAME_LENGTH {
        return Err(invalid(format!(
            "{} (max: {}, got: {})",
            errmsg::TABLE_NAME_TOO_LONG,
            limits::MAX_TABLE_NAME_LENGTH,
            name.len()
        )));
    }

    let mut chars = name.chars();
    let first_char = match chars.next() {
        Some(c) => c,
        None => return Err(invalid(errmsg::TABLE_NAME_EMPTY.to_string())),
    };
    if !first_char.is_ascii_lowercase() {
        return Err(invalid(errmsg::TABLE_NAME_INVALID_START.to_string()));
    }

    for c in chars {
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return Err(invalid(errmsg::TABLE_NAME_INVALID_CHARS.to_string()));
        }
    }

    Ok(())
}

/// Require the cutoff to be strictly before January 1 of `today`'s year.
pub fn validate_cutoff(cutoff: NaiveDate, today: NaiveDate) -> Result<(), PurgeError> {
    let year_start = start_of_year(today.year()).unwrap_or(today);
    if cutoff >= year_start {
        return Err(PurgeError::CutoffNotBeforeCurrentYear { cutoff, year_start });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn reason(name: &str) -> String {
        match validate_table_name(name) {
            Err(PurgeError::InvalidTableName { reason, .. }) => reason,
            other => panic!("expected InvalidTableName, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_table_names() {
        assert!(validate_table_name("client_visits").is_ok());
        assert!(validate_table_name("pig_pound_log").is_ok());
        assert!(validate_table_name("t2").is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(reason(""), errmsg::TABLE_NAME_EMPTY);
    }

    #[test]
    fn test_long_name_rejected() {
        let name = "a".repeat(limits::MAX_TABLE_NAME_LENGTH + 1);
        assert!(reason(&name).starts_with(errmsg::TABLE_NAME_TOO_LONG));
        assert!(validate_table_name(&"a".repeat(limits::MAX_TABLE_NAME_LENGTH)).is_ok());
    }

    #[test]
    fn test_invalid_start_rejected() {
        assert_eq!(reason("_visits"), errmsg::TABLE_NAME_INVALID_START);
        assert_eq!(reason("1visits"), errmsg::TABLE_NAME_INVALID_START);
    }

    #[test]
    fn test_injection_attempt_rejected() {
        assert_eq!(
            reason("donations; drop table donors"),
            errmsg::TABLE_NAME_INVALID_CHARS
        );
        assert_eq!(reason("surplus-log"), errmsg::TABLE_NAME_INVALID_CHARS);
        assert_eq!(reason("donations\""), errmsg::TABLE_NAME_INVALID_CHARS);
    }

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize_table_name("  Surplus_Log \n"), "surplus_log");
    }

    #[test]
    fn test_cutoff_must_precede_current_year() {
        let today = date(2025, 6, 15);
        assert!(validate_cutoff(date(2024, 12, 31), today).is_ok());
        assert!(validate_cutoff(date(2024, 1, 1), today).is_ok());
        assert!(matches!(
            validate_cutoff(date(2025, 1, 1), today),
            Err(PurgeError::CutoffNotBeforeCurrentYear { .. })
        ));
        assert!(validate_cutoff(date(2025, 3, 1), today).is_err());
    }
}
