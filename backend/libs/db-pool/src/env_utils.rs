//! Environment variable parsing utilities
//!
//! Parse environment variables with defaults, without unwrap() calls.

use std::str::FromStr;

/// Parse an environment variable with a default fallback
///
/// Missing and unparsable values both yield `default`.
///
/// # Example
/// ```ignore
/// let timeout: u64 = parse_env_with_default("DB_CONNECT_TIMEOUT_SECS", 5);
/// ```
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    parse_env_optional(key).unwrap_or(default)
}

/// Parse an environment variable, returning None if missing or invalid
pub fn parse_env_optional<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a boolean flag the way config files usually spell them
///
/// Accepts `1/0`, `true/false`, `yes/no`, `on/off` (case-insensitive).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
