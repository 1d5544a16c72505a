// Utility helpers

use std::str::FromStr;

use crate::constants::ADDRESS_LENGTH;

// Internal helper that supports `env_non_empty` operations.
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses an env var, falling back to `default` when it is unset or blank.
pub fn env_parse_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_non_empty(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {name} '{raw}': {e}")),
        None => Ok(default),
    }
}

/// True for `0x` followed by 1..=64 hex digits.
pub fn is_object_id(value: &str) -> bool {
    let Some(digits) = value.trim().strip_prefix("0x") else {
        return false;
    };
    !digits.is_empty()
        && digits.len() <= ADDRESS_LENGTH * 2
        && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Canonical `0x` + 64 lowercase hex form of an id or address.
///
/// Values that are not hex ids are returned trimmed but otherwise untouched,
/// so comparisons against them keep failing the way they would on the wire.
pub fn normalize_address(value: &str) -> String {
    let trimmed = value.trim();
    if !is_object_id(trimmed) {
        return trimmed.to_string();
    }
    let digits = trimmed.trim_start_matches("0x").to_ascii_lowercase();
    format!("0x{:0>64}", digits)
}

/// Decodes an object id into its 32 raw bytes.
pub fn object_id_bytes(value: &str) -> Option<[u8; ADDRESS_LENGTH]> {
    if !is_object_id(value) {
        return None;
    }
    let canonical = normalize_address(value);
    let raw = hex::decode(canonical.trim_start_matches("0x")).ok()?;
    raw.try_into().ok()
}

pub fn same_address(a: &str, b: &str) -> bool {
    normalize_address(a) == normalize_address(b)
}
