//! Status, content type, and budget header handling.

use chrono::{DateTime, Utc};
use harvest_core::{BudgetObservation, HarvestError};
use reqwest::header::{CONTENT_TYPE, DATE, HeaderMap, RETRY_AFTER};

/// Header carrying the weight used in the current one-minute window.
pub const USED_WEIGHT_HEADER: &str = "X-MBX-USED-WEIGHT-1M";

/// Map a non-success status to its error.
///
/// 429 (too many requests) and 418 (IP banned) are quota signals and carry
/// the server's `Retry-After` hint when present.
///
/// # Errors
/// `RateLimited` or `UnexpectedStatus` for anything outside 2xx.
pub fn check_status(status: u16, headers: &HeaderMap) -> Result<(), HarvestError> {
    match status {
        200..=299 => Ok(()),
        418 | 429 => Err(HarvestError::RateLimited {
            status,
            retry_after_ms: retry_after_ms(headers),
        }),
        other => Err(HarvestError::UnexpectedStatus { status: other }),
    }
}

/// Require a JSON body.
///
/// # Errors
/// `UnexpectedContentType` when the media type is not `application/json`.
pub fn check_content_type(headers: &HeaderMap) -> Result<(), HarvestError> {
    let raw = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let essence = raw.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case("application/json") {
        Ok(())
    } else {
        Err(HarvestError::UnexpectedContentType {
            content_type: raw.to_string(),
        })
    }
}

/// Decode server time and used weight from response headers.
///
/// # Errors
/// `MissingBudgetHeader` when either header is absent or unparsable.
pub fn budget_observation(headers: &HeaderMap) -> Result<BudgetObservation, HarvestError> {
    let server_time = headers
        .get(DATE)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| DateTime::parse_from_rfc2822(s.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| HarvestError::missing_header("Date"))?;
    let used_weight = headers
        .get(USED_WEIGHT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u32>().ok())
        .ok_or_else(|| HarvestError::missing_header(USED_WEIGHT_HEADER))?;
    Ok(BudgetObservation {
        server_time,
        used_weight,
    })
}

fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1_000))
}
