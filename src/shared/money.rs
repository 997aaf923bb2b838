//! Money helpers.
//!
//! Amounts are stored as integer minor units (paise). WooCommerce and the
//! admin UI exchange decimal strings such as `"1299.50"`.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount: {0:?}")]
pub struct AmountError(pub String);

/// Parse a decimal string into minor units.
///
/// Empty input is zero. At most two fractional digits are kept; extra
/// digits are rejected rather than silently rounded.
pub fn parse_minor_units(raw: &str) -> Result<i64, AmountError> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(0);
    }

    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };

    let valid = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !valid(whole) || !valid(frac) || frac.len() > 2 {
        return Err(AmountError(raw.to_string()));
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| AmountError(raw.to_string()))?
    };
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| AmountError(raw.to_string()))? * 10,
        _ => frac.parse().map_err(|_| AmountError(raw.to_string()))?,
    };

    let value = whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| AmountError(raw.to_string()))?;

    Ok(if negative { -value } else { value })
}

/// Format minor units as a two-decimal string.
pub fn format_minor_units(value: i64) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
