use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Planned forward/inverse FFT pair of a fixed length.
///
/// Plans are `Send + Sync`, so one transform is shared by every scoring task.
#[derive(Clone)]
pub struct SpectralTransform {
    n: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl SpectralTransform {
    pub fn new(n: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);
        Self {
            n,
            forward,
            inverse,
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Forward transform of a real sequence of exactly `len()` samples.
    pub fn coefficients(&self, x: &[f64]) -> Vec<Complex64> {
        debug_assert_eq!(x.len(), self.n);
        let mut buf: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.forward.process(&mut buf);
        buf
    }

    /// Unnormalised inverse transform, keeping the real part.
    ///
    /// The result is `n` times the true inverse; callers fold `1/n` into their scaling.
    pub fn sequence(&self, coefficients: Vec<Complex64>) -> Vec<f64> {
        debug_assert_eq!(coefficients.len(), self.n);
        let mut buf = coefficients;
        self.inverse.process(&mut buf);
        buf.into_iter().map(|c| c.re).collect()
    }
}

impl fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectralTransform").field("n", &self.n).finish()
    }
}
