//! Textual placeholder pass run before any parsing.
//!
//! The tokens are quoted because they sit inside JSON string literals in the source text; the
//! quotes are consumed by the replacement so that dates land as extended-JSON objects and the
//! sample budget lands as a bare number.

pub const FROM_TOKEN: &str = "\"$from\"";
pub const TO_TOKEN: &str = "\"$to\"";
pub const MAX_DATA_POINTS_TOKEN: &str = "\"$maxDataPoints\"";

/// Extended-JSON date literal for an epoch-millisecond instant.
#[must_use]
pub fn date_literal(epoch_ms: i64) -> String {
    format!("{{\"$date\": {{\"$numberLong\": \"{epoch_ms}\"}}}}")
}

/// Replace the window start, window end and sample-budget tokens, in that order.
#[must_use]
pub fn substitute(text: &str, from: i64, to: i64, max_data_points: i64) -> String {
    text.replace(FROM_TOKEN, &date_literal(from))
        .replace(TO_TOKEN, &date_literal(to))
        .replace(MAX_DATA_POINTS_TOKEN, &max_data_points.to_string())
}
