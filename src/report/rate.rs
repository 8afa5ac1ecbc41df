//! Rate arithmetic for derived KPIs.
//!
//! A rate over an empty group is undefined and reported as `None`, never as
//! zero and never as a division by zero. The SQL side mirrors this with
//! `NULLIF(COUNT(*), 0)`.

/// Decimal places used for percentage rates.
pub const PERCENT_PLACES: u32 = 2;

/// Returns `part / total`, or `None` when `total` is not positive.
pub fn fraction(part: i64, total: i64) -> Option<f64> {
    if total <= 0 || part < 0 {
        return None;
    }
    Some(part as f64 / total as f64)
}

/// Returns `100 * part / total` rounded to [`PERCENT_PLACES`].
pub fn percent(part: i64, total: i64) -> Option<f64> {
    fraction(part, total).map(|f| round_to(f * 100.0, PERCENT_PLACES))
}

/// Rounds half away from zero, matching PostgreSQL `ROUND(numeric, n)`.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
