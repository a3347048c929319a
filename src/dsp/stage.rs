//! Filter stage
//!
//! One direct-form-I biquad with its own delay registers. State precision
//! follows the sample type (`f32` or `f64`).

use num_traits::Float;

use super::coefficients::CoefficientSet;

/// History values below this magnitude are flushed to zero after each block
const DENORMAL_THRESHOLD: f64 = 1.0e-15;

#[inline]
fn cast<T: Float>(value: f64) -> T {
    T::from(value).unwrap_or_else(T::zero)
}

/// Single biquad section
///
/// Replacing the coefficients keeps the delay registers, so a running signal
/// continues without a reset. A bypassed stage leaves samples and registers
/// untouched; its history stays frozen until the stage is enabled again.
#[derive(Debug, Clone)]
pub struct FilterStage<T: Float = f32> {
    coefficients: CoefficientSet,
    b0: T,
    b1: T,
    b2: T,
    a1: T,
    a2: T,
    x1: T, // x[n-1]
    x2: T, // x[n-2]
    y1: T, // y[n-1]
    y2: T, // y[n-2]
    bypassed: bool,
}

impl<T: Float> Default for FilterStage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> FilterStage<T> {
    /// Create an active stage with identity coefficients
    pub fn new() -> Self {
        let mut stage = Self {
            coefficients: CoefficientSet::IDENTITY,
            b0: T::one(),
            b1: T::zero(),
            b2: T::zero(),
            a1: T::zero(),
            a2: T::zero(),
            x1: T::zero(),
            x2: T::zero(),
            y1: T::zero(),
            y2: T::zero(),
            bypassed: false,
        };
        stage.set_coefficients(&CoefficientSet::IDENTITY);
        stage
    }

    /// Install a new coefficient set without touching the delay registers
    pub fn set_coefficients(&mut self, coefficients: &CoefficientSet) {
        self.coefficients = *coefficients;
        self.b0 = cast(coefficients.b0);
        self.b1 = cast(coefficients.b1);
        self.b2 = cast(coefficients.b2);
        self.a1 = cast(coefficients.a1);
        self.a2 = cast(coefficients.a2);
    }

    /// Coefficients currently installed
    pub fn coefficients(&self) -> &CoefficientSet {
        &self.coefficients
    }

    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Process one sample, ignoring the bypass flag
    #[inline]
    pub fn process_sample(&mut self, input: T) -> T {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    /// Filter `samples` in place; a bypassed stage returns immediately
    pub fn process_block(&mut self, samples: &mut [T]) {
        if self.bypassed {
            return;
        }
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
        self.snap_to_zero();
    }

    /// Flush decayed history so silence does not run into denormals
    pub fn snap_to_zero(&mut self) {
        let threshold = cast::<T>(DENORMAL_THRESHOLD);
        for value in [&mut self.x1, &mut self.x2, &mut self.y1, &mut self.y2] {
            if value.abs() < threshold {
                *value = T::zero();
            }
        }
    }

    /// Clear the delay registers
    pub fn reset(&mut self) {
        self.x1 = T::zero();
        self.x2 = T::zero();
        self.y1 = T::zero();
        self.y2 = T::zero();
    }

    /// Linear magnitude of the installed coefficients at `frequency` Hz
    pub fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.coefficients.magnitude(frequency, sample_rate)
    }

    /// Delay registers as (x1, x2, y1, y2)
    pub fn history(&self) -> (T, T, T, T) {
        (self.x1, self.x2, self.y1, self.y2)
    }
}
