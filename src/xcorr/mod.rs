//! Normalised cross-correlation computed in the frequency domain.
//!
//! Lag convention: `cc[k] = Σ x[t + k] · y[t]`, where `x` is the reference and `y` the
//! candidate. A candidate that trails the reference by `k` samples peaks at lag `-k`;
//! one that leads it peaks at `+k`.

pub mod transform;

use crate::error::{RankError, RankResult};
use crate::reference::ReferenceContext;
use crate::stats::{max_abs_index, next_pow_of_two, z_normalize, zero_pad};
use transform::SpectralTransform;

/// Full correlation sequence plus its signed peak.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation {
    pub sequence: Vec<f64>,
    pub lag: i64,
    pub value: f64,
}

/// Power-of-two working length for series of `len` samples.
///
/// At least `2 * len`, so every lag with `|lag| < len` is represented without
/// circular wraparound.
pub fn transform_len(len: usize) -> usize {
    next_pow_of_two((2 * len) as f64)
}

/// Cross-correlates `x` against `y` over a working length of at least `n`.
///
/// With `normalize`, both inputs are z-normalised first and the peak lands in
/// `[-1, 1]`; a flat input fails with `DegenerateSeries`. Without it the raw
/// circular correlation is returned.
pub fn cross_correlate(x: &[f64], y: &[f64], n: usize, normalize: bool) -> RankResult<Correlation> {
    if x.is_empty() || y.is_empty() {
        return Err(RankError::invalid_input("cannot correlate an empty sequence"));
    }
    let n = n.max(x.len()).max(y.len());

    let (x, y, scale) = if normalize {
        let denom = ((x.len() as f64 - 1.0) * (y.len() as f64 - 1.0)).sqrt();
        (z_normalize(x)?, z_normalize(y)?, 1.0 / (n as f64 * denom))
    } else {
        (x.to_vec(), y.to_vec(), 1.0 / n as f64)
    };

    let ft = SpectralTransform::new(n);
    let big_x = ft.coefficients(&zero_pad(&x, n));
    let big_y = ft.coefficients(&zero_pad(&y, n));
    let product = big_x
        .iter()
        .zip(big_y.iter())
        .map(|(a, b)| a * b.conj())
        .collect();

    let cc: Vec<f64> = ft.sequence(product).into_iter().map(|v| v * scale).collect();
    let mut correlation = peak(cc);
    if normalize {
        correlation.value = clip_unit(correlation.value);
    }
    Ok(correlation)
}

/// Correlates one candidate against a prepared reference.
///
/// The candidate must have the reference's sample count. Flat candidates fail with
/// `DegenerateSeries`; callers decide whether that means "no match" or "uncorrelated".
pub fn correlate_with_reference(reference: &ReferenceContext, y: &[f64]) -> RankResult<Correlation> {
    if y.len() != reference.series_len() {
        return Err(RankError::invalid_input(format!(
            "candidate has {} samples, reference has {}",
            y.len(),
            reference.series_len()
        )));
    }

    let n = reference.n();
    let y = z_normalize(y)?;
    let ft = reference.transform();

    let product = ft
        .coefficients(&zero_pad(&y, n))
        .into_iter()
        .zip(reference.coefficients().iter())
        .map(|(c, x)| x * c.conj())
        .collect();

    let scale = 1.0 / n as f64;
    let cc: Vec<f64> = ft.sequence(product).into_iter().map(|v| v * scale).collect();
    let mut correlation = peak(cc);
    correlation.value = clip_unit(correlation.value);
    Ok(correlation)
}

fn peak(sequence: Vec<f64>) -> Correlation {
    let n = sequence.len();
    let mi = max_abs_index(&sequence);
    let value = sequence.get(mi).copied().unwrap_or(0.0);
    let lag = if mi > n / 2 {
        mi as i64 - n as i64
    } else {
        mi as i64
    };
    Correlation {
        sequence,
        lag,
        value,
    }
}

fn clip_unit(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}
