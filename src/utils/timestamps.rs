use crate::error::{ProcessingError, Result};
use crate::utils::constants::RAW_TIMESTAMP_FORMAT;
use chrono::{DateTime, FixedOffset, SecondsFormat};

/// Parse a measurement timestamp.
///
/// Accepts the upstream extract layout (`2023/01/01 01:00:00+00`), the same
/// layout with dashes, and RFC 3339 as written to the time dimension.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_str(value, RAW_TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%#z"))
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map_err(|_| ProcessingError::InvalidFormat(format!("Invalid timestamp: '{}'", value)))
}

/// Render a timestamp in the upstream extract layout
pub fn format_raw_timestamp(value: &DateTime<FixedOffset>) -> String {
    value.format("%Y/%m/%d %H:%M:%S%:z").to_string()
}

/// Render a timestamp as RFC 3339 for the time dimension
pub fn format_rfc3339(value: &DateTime<FixedOffset>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}
