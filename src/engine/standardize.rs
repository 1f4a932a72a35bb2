//! Conversions from raw group sums to reporting scales.
//!
//! Every rounding here is half away from zero (`f64::round`).

use crate::types::instrument::Norm;

pub fn t_score(raw: f64, norm: Norm) -> i32 {
    (50.0 + 10.0 * (raw - norm.mean) / norm.sd).round() as i32
}

/// Normal-curve percentile of a T-score, clamped to `[1, 99]`.
pub fn t_score_percentile(t_score: i32) -> u32 {
    let z = (f64::from(t_score) - 50.0) / 10.0;
    let percentile = 50.0 * (1.0 + erf(z / std::f64::consts::SQRT_2));
    percentile.clamp(1.0, 99.0).round() as u32
}

/// Abramowitz and Stegun 7.1.26, max error 1.5e-7.
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

/// Sten score rounded to one decimal and clamped to `[1, 10]`.
pub fn sten(raw: f64, norm: Norm) -> f64 {
    let z = (raw - norm.mean) / norm.sd;
    let sten = 5.5 + 2.0 * z;
    ((sten * 10.0).round() / 10.0).clamp(1.0, 10.0)
}

pub fn sten_percentage(sten: f64) -> i32 {
    ((sten - 1.0) / 9.0 * 100.0).round() as i32
}

/// Linear rescale of `raw` from `[low, high]` onto `[0, 100]`. Raw values
/// under `low` (unanswered items) come out negative.
pub fn percentage(raw: f64, low: f64, high: f64) -> i32 {
    ((raw - low) / (high - low) * 100.0).round() as i32
}

/// Split of a two-pole axis as `(first, second)` percentages summing to 100.
pub fn dichotomy_split(first: u32, second: u32) -> (i32, i32) {
    let total = first + second;
    let first_share = if total > 0 {
        (f64::from(first) / f64::from(total) * 100.0).round() as i32
    } else {
        50
    };
    (first_share, 100 - first_share)
}
