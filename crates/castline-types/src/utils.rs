use chrono::NaiveDateTime;

use crate::errors::ExtractError;

/// Parses a `0x`-prefixed hex quantity such as a block number.
pub fn hex_to_i64(value: &str) -> Result<i64, ExtractError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| ExtractError::InvalidHex(value.to_string()))?;
    i64::from_str_radix(digits, 16).map_err(|_| ExtractError::InvalidHex(value.to_string()))
}

/// Converts an ISO-8601 UTC timestamp (`2023-04-01T12:00:00.000Z`) into
/// epoch milliseconds. The fractional part is optional.
pub fn iso_to_epoch_millis(value: &str) -> Result<i64, ExtractError> {
    let trimmed = value
        .strip_suffix('Z')
        .ok_or_else(|| ExtractError::InvalidTimestamp(value.to_string()))?;
    let naive = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| ExtractError::InvalidTimestamp(value.to_string()))?;
    Ok(naive.and_utc().timestamp_millis())
}

pub fn bool_to_flag(value: bool) -> i32 {
    i32::from(value)
}

pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}
