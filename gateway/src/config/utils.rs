//! Helpers for reading raw configuration values.

use std::error::Error;
use std::path::Path;
use std::str::FromStr;

/// Read an environment variable, treating empty or whitespace-only values as unset.
pub(super) fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse an environment variable, returning `None` when it is unset.
pub(super) fn parse_env<T>(name: &str) -> Result<Option<T>, Box<dyn Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {name} ('{raw}'): {e}").into()),
        None => Ok(None),
    }
}

/// Parse a boolean flag. Accepts true/false, 1/0, yes/no and on/off.
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(super) fn parse_env_bool(name: &str) -> Result<Option<bool>, Box<dyn Error>> {
    match env_var(name) {
        Some(raw) => parse_bool(&raw)
            .map(Some)
            .ok_or_else(|| format!("Invalid boolean for {name}: '{raw}'").into()),
        None => Ok(None),
    }
}

/// Contents of a secret file with surrounding whitespace removed, if it exists
/// and is not empty.
pub(super) fn read_secret_file(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|contents| contents.trim().to_string())
        .filter(|contents| !contents.is_empty())
}

/// Public base URL used when none is configured.
pub(super) fn default_public_base_url(port: u16) -> String {
    format!("http://localhost:{port}")
}
