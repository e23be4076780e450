//! Numeric helpers for keeping solver output well behaved

/// Replace NaN or infinite values with 0.0, finite values are returned unchanged
pub fn sanitize_float(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Divide, returning 0.0 when the result would not be finite
pub(crate) fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    sanitize_float(numerator / denominator)
}

/// Round to a number of decimal places, non-finite values become 0.0
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    sanitize_float((sanitize_float(value) * scale).round() / scale)
}

/// Round to four decimal places, the precision reported for fluxes and rates
pub(crate) fn round4(value: f64) -> f64 {
    round_to(value, 4)
}
