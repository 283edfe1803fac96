use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Formats a peso amount the way `es-CL` renders CLP: no decimals, `.` as
/// the thousands separator, e.g. `$1.290` or `-$15.000`.
#[must_use]
pub fn format_clp(price: Decimal) -> String {
    let rounded = price.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Formats a capture time as `dd-mm-yyyy, HH:MM:SS` (UTC), or an em dash when
/// the backend did not report one.
#[must_use]
pub fn format_timestamp(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map_or_else(
        || "\u{2014}".to_string(),
        |ts| ts.format("%d-%m-%Y, %H:%M:%S").to_string(),
    )
}
