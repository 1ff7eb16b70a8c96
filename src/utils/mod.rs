//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use regex::Regex;
use std::sync::OnceLock;

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

/// Case- and whitespace-insensitive key used for label matching
pub fn match_key(text: &str) -> String {
    normalize_whitespace(text).to_lowercase()
}

/// Make a string safe for use as a SQL identifier or file stem
///
/// Anything outside `[A-Za-z0-9_]` becomes `_`.
pub fn sanitize_identifier(name: &str) -> String {
    static INVALID_CHARS: OnceLock<Regex> = OnceLock::new();

    let re = INVALID_CHARS.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("Invalid regex pattern"));

    re.replace_all(name.trim(), "_").to_string()
}

/// Strip the `.0` that float-typed identifier columns pick up
pub fn strip_float_suffix(raw: &str) -> &str {
    raw.strip_suffix(".0").unwrap_or(raw)
}
