//! Rounding and rendering rules for display values
//!
//! Devices transmit single-precision floats. The log keeps a fixed number of
//! decimals per quantity and renders each number in its shortest form that
//! round-trips, always with at least one fractional digit (`1.0`, `12.35`).
//!
//! ## Rounding
//!
//! Rounding goes through correctly-rounded decimal formatting of the widened
//! `f64`, not `(x * 10^n).round() / 10^n`. The scaled multiply can land on the
//! wrong side of a boundary (e.g. `1.005 * 100.0 == 100.49999999999999`),
//! formatting rounds the exact binary value instead.

/// Round `value` to `decimals` fractional digits.
///
/// Non-finite values pass through unchanged.
pub fn round_to_decimals(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", decimals as usize, value)
        .parse()
        .unwrap_or(value)
}

/// Render a rounded value for the record log.
///
/// Finite values use the shortest round-trip representation; large magnitudes
/// switch to exponent form with an explicit sign and two-digit exponent
/// (`1e+16`). Non-finite values render as `nan`, `inf`, `-inf`.
pub fn render_decimal(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() { "inf" } else { "-inf" }.to_string();
    }

    let shortest = format!("{:?}", value);
    match shortest.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => shortest,
    }
}
