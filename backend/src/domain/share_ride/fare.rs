//! Trip fare calculation.

/// Fare for `distance` units at `rate_per_unit`, rounded half away from zero.
///
/// Inputs are validated by the caller. Results beyond the `i64` range
/// saturate.
///
/// # Examples
/// ```
/// use carpool::domain::compute_fare;
///
/// assert_eq!(compute_fare(20, 5.0), 100);
/// assert_eq!(compute_fare(1, 1.5), 2);
/// ```
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "fares are far below 2^53 minor units; saturating cast is intended"
)]
pub fn compute_fare(rate_per_unit: i64, distance: f64) -> i64 {
    (rate_per_unit as f64 * distance).round() as i64
}
