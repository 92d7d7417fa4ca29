use crate::error::{RankError, RankResult};
use crate::labels::Labels;
use crate::series::Series;
use crate::stats::{z_normalize, zero_pad};
use crate::xcorr::transform::SpectralTransform;
use crate::xcorr::transform_len;
use num_complex::Complex64;

/// Reference series prepared once per engine: normalised, padded and transformed.
///
/// The reference is z-normalised and then scaled by `1/(len-1)`, which pre-bakes the
/// sample-variance denominator shared by every comparison. Candidates then only need
/// their own z-normalisation and a `1/n` inverse-transform scale to land in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct ReferenceContext {
    labels: Labels,
    len: usize,
    coefficients: Vec<Complex64>,
    transform: SpectralTransform,
}

impl ReferenceContext {
    pub fn new(reference: &Series) -> RankResult<Self> {
        let len = reference.len();
        if len < 2 {
            return Err(RankError::invalid_input(format!(
                "reference series needs at least 2 samples, got {len}"
            )));
        }

        let n = transform_len(len);
        let scale = 1.0 / (len as f64 - 1.0);
        let x: Vec<f64> = z_normalize(reference.values())?
            .into_iter()
            .map(|v| v * scale)
            .collect();

        let transform = SpectralTransform::new(n);
        let coefficients = transform.coefficients(&zero_pad(&x, n));

        Ok(Self {
            labels: reference.labels().clone(),
            len,
            coefficients,
            transform,
        })
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Sample count of the reference; candidates must match it.
    pub fn series_len(&self) -> usize {
        self.len
    }

    /// Working transform length.
    pub fn n(&self) -> usize {
        self.transform.len()
    }

    pub fn coefficients(&self) -> &[Complex64] {
        &self.coefficients
    }

    pub fn transform(&self) -> &SpectralTransform {
        &self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_support::series;

    #[test]
    fn transform_length_covers_twice_the_reference() {
        let reference = series(
            &[0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 3.0, 2.0, 1.0, 0.0, 0.0],
            &[("graph", "graph1")],
        );
        let ctx = ReferenceContext::new(&reference).unwrap();
        assert_eq!(ctx.series_len(), 12);
        assert_eq!(ctx.n(), 32);
        assert_eq!(ctx.coefficients().len(), 32);
        assert_eq!(ctx.labels().get("graph"), Some("graph1"));
    }

    #[test]
    fn power_of_two_reference_still_doubles() {
        let reference = series(&[1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0, 34.0], &[("g", "fib")]);
        let ctx = ReferenceContext::new(&reference).unwrap();
        assert_eq!(ctx.n(), 16);
    }

    #[test]
    fn dc_term_vanishes_after_normalisation() {
        let reference = series(&[4.0, 1.0, 7.0, 2.0, 9.0], &[("g", "x")]);
        let ctx = ReferenceContext::new(&reference).unwrap();
        assert!(ctx.coefficients()[0].norm() < 1e-12);
    }

    #[test]
    fn flat_reference_is_degenerate() {
        let reference = series(&[2.0; 6], &[("g", "flat")]);
        let err = ReferenceContext::new(&reference).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateSeries);
    }

    #[test]
    fn short_reference_is_invalid() {
        let empty = series(&[], &[("g", "empty")]);
        assert_eq!(
            ReferenceContext::new(&empty).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        let single = series(&[1.0], &[("g", "one")]);
        assert_eq!(
            ReferenceContext::new(&single).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }
}
