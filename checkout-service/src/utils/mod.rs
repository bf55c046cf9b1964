//! Request value parsing.

use serde_json::Value;

use crate::services::CheckoutError;

/// Parse a checkout amount given in the smallest currency unit.
///
/// Accepts a JSON number or a numeric string and rounds to the nearest
/// unit. Zero, negative, non-finite and non-numeric values are rejected, as
/// is anything a stored `i64` cannot hold.
pub fn parse_amount(value: &Value) -> Result<u64, CheckoutError> {
    let invalid = || CheckoutError::InvalidRequest("Invalid amount".to_string());

    let raw = match value {
        Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if !raw.is_finite() {
        return Err(invalid());
    }

    let rounded = raw.round();
    // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
    if rounded <= 0.0 || rounded >= i64::MAX as f64 {
        return Err(invalid());
    }

    Ok(rounded as u64)
}
