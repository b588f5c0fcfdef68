//! # Validation Module
//!
//! Syntactic checks applied at the boundary before anything reaches the
//! engine. The store is fully parameterised, so the SQL-pattern rejection
//! here is belt-and-braces, not the actual injection defence.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AuthError;

/// Canonical UUIDv4 shape, case-insensitive hex with dashes.
static CLIENT_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("client key pattern compiles")
});

static USER_ROLE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").expect("name pattern compiles"));

/// Permission names may be longer than role and user names.
static PERMISSION_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,128}$").expect("permission pattern compiles"));

static SQL_TOKEN_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC|UNION|SCRIPT)\b",
        r"(--|#|/\*|\*/|;)",
        r"(?i)\b(OR|AND)\b\s+\d+\s*=\s*\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("sql token pattern compiles"))
    .collect()
});

pub fn validate_client_key(client_key: &str) -> bool {
    CLIENT_KEY_PATTERN.is_match(client_key)
}

pub fn validate_user_name(user_name: &str) -> bool {
    USER_ROLE_NAME_PATTERN.is_match(user_name)
}

pub fn validate_role_name(role_name: &str) -> bool {
    USER_ROLE_NAME_PATTERN.is_match(role_name)
}

pub fn validate_permission_name(permission_name: &str) -> bool {
    PERMISSION_NAME_PATTERN.is_match(permission_name)
}

/// Strip everything outside `[A-Za-z0-9_-]`.
pub fn sanitize_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Reject SQL-keyword patterns and comment tokens, then sanitize.
///
/// Returns `None` when the input carries an injection-shaped token or
/// sanitizes down to nothing.
pub fn validate_and_sanitize(input: &str) -> Option<String> {
    if SQL_TOKEN_PATTERNS.iter().any(|p| p.is_match(input)) {
        return None;
    }
    let sanitized = sanitize_input(input);
    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Validate a `(user, role)` parameter pair as one check.
pub fn require_user_and_role(user: &str, role: &str) -> Result<(), AuthError> {
    if !validate_user_name(user) {
        return Err(AuthError::BadInput(format!("Invalid user name: {user}")));
    }
    if !validate_role_name(role) {
        return Err(AuthError::BadInput(format!("Invalid role name: {role}")));
    }
    Ok(())
}

pub fn require_role(role: &str) -> Result<(), AuthError> {
    if !validate_role_name(role) {
        return Err(AuthError::BadInput(format!("Invalid role name: {role}")));
    }
    Ok(())
}

pub fn require_user(user: &str) -> Result<(), AuthError> {
    if !validate_user_name(user) {
        return Err(AuthError::BadInput(format!("Invalid user name: {user}")));
    }
    Ok(())
}

pub fn require_permission(name: &str) -> Result<(), AuthError> {
    if !validate_permission_name(name) {
        return Err(AuthError::BadInput(format!("Invalid permission name: {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_uuid4() {
        assert!(validate_client_key("550e8400-e29b-41d4-a716-446655440000"));
        assert!(validate_client_key("550E8400-E29B-41D4-A716-446655440000"));
    }

    #[test]
    fn rejects_malformed_client_keys() {
        assert!(!validate_client_key("not-a-uuid"));
        assert!(!validate_client_key(""));
        assert!(!validate_client_key("550e8400e29b41d4a716446655440000"));
        assert!(!validate_client_key("550e8400-e29b-41d4-a716-44665544000g"));
    }

    #[test]
    fn name_patterns() {
        assert!(validate_role_name("admin"));
        assert!(validate_user_name("john_doe-2"));
        assert!(!validate_role_name("../etc/passwd"));
        assert!(!validate_user_name("user name"));
        assert!(!validate_role_name(""));
        assert!(!validate_role_name(&"a".repeat(65)));
        assert!(validate_permission_name(&"a".repeat(128)));
        assert!(!validate_permission_name(&"a".repeat(129)));
    }

    #[test]
    fn sanitizer_strips_everything_else() {
        assert_eq!(sanitize_input("ad'min; --"), "admin--");
        assert_eq!(sanitize_input("../etc/passwd"), "etcpasswd");
    }

    #[test]
    fn sql_tokens_are_rejected() {
        assert!(validate_and_sanitize("DROP TABLE auth_role").is_none());
        assert!(validate_and_sanitize("x; --").is_none());
        assert!(validate_and_sanitize("1 OR 1=1").is_none());
        assert_eq!(validate_and_sanitize("admin").as_deref(), Some("admin"));
    }

    #[test]
    fn pair_validation_reports_the_offender() {
        assert!(require_user_and_role("john", "admin").is_ok());
        let err = require_user_and_role("bad user", "admin").unwrap_err();
        assert!(matches!(err, AuthError::BadInput(msg) if msg.contains("user")));
        let err = require_user_and_role("john", "bad role").unwrap_err();
        assert!(matches!(err, AuthError::BadInput(msg) if msg.contains("role")));
    }
}
