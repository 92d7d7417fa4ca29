//! Small numeric helpers shared by the correlation engine.

use crate::error::{RankError, RankResult};
use statrs::statistics::Statistics;

/// Smallest power of two that is `>= val`; zero for non-positive input.
pub fn next_pow_of_two(val: f64) -> usize {
    if !(val > 0.0) {
        return 0;
    }
    if val <= 1.0 {
        return 1;
    }
    (val.ceil() as usize).next_power_of_two()
}

/// Left-pads `x` with zeros to length `n` so the final samples stay aligned.
///
/// Inputs already at least `n` long are returned unchanged.
pub fn zero_pad(x: &[f64], n: usize) -> Vec<f64> {
    if n <= x.len() {
        return x.to_vec();
    }
    let mut padded = vec![0.0; n];
    padded[n - x.len()..].copy_from_slice(x);
    padded
}

/// Subtracts the mean and divides by the sample standard deviation.
///
/// Fails with `DegenerateSeries` when the deviation is zero or undefined
/// (fewer than two samples).
pub fn z_normalize(x: &[f64]) -> RankResult<Vec<f64>> {
    let mean = x.iter().mean();
    let centered: Vec<f64> = x.iter().map(|v| v - mean).collect();
    let std_dev = centered.iter().std_dev();
    if !std_dev.is_finite() || std_dev == 0.0 {
        return Err(RankError::DegenerateSeries);
    }
    Ok(centered.into_iter().map(|v| v / std_dev).collect())
}

/// Index of the largest absolute value; the first one wins on ties.
pub fn max_abs_index(x: &[f64]) -> usize {
    let mut max_index = 0;
    let mut max_val = 0.0_f64;
    for (i, v) in x.iter().enumerate() {
        if v.abs() > max_val.abs() {
            max_val = *v;
            max_index = i;
        }
    }
    max_index
}
