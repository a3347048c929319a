//! Coefficient design
//!
//! Pure functions turning a `ChainSettings` snapshot into biquad coefficient
//! sets. Peak sections follow the Audio EQ Cookbook peaking filter; cut
//! sections split an even-order Butterworth response into matched
//! second-order sections.
//! Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{EqError, Result};
use crate::params::{ChainSettings, Slope};

/// Number of second-order sections in each cut group
pub const MAX_CUT_SECTIONS: usize = 4;

/// Lowest sample rate the designer accepts
pub const MIN_SAMPLE_RATE: f64 = 8000.0;

/// Highest sample rate the designer accepts
pub const MAX_SAMPLE_RATE: f64 = 768_000.0;

/// Design frequencies are kept below this fraction of the sample rate
const NYQUIST_GUARD: f64 = 0.49;

/// Lowest design frequency in Hz
const MIN_DESIGN_FREQ: f64 = 1.0;

/// Lowest accepted Q
const MIN_Q: f64 = 0.01;

/// Coefficients of every section in one cut group; unused sections hold identity
pub type CutCoefficients = [CoefficientSet; MAX_CUT_SECTIONS];

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
/// Normalized: all coefficients divided by a0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSet {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for CoefficientSet {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CoefficientSet {
    /// Unity gain, no filtering
    pub const IDENTITY: CoefficientSet = CoefficientSet {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Build a normalized set from raw transfer function coefficients
    pub fn from_raw(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Peaking EQ (constant-Q) with linear amplitude `gain` at `frequency`
    pub fn peak(frequency: f64, q: f64, gain: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        // Cookbook A is the square root of the linear peak gain
        let a = gain.sqrt();

        Self::from_raw(
            1.0 + alpha * a,
            -2.0 * cos_w0,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_w0,
            1.0 - alpha / a,
        )
    }

    /// Second-order low-pass section
    pub fn low_pass(frequency: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::from_raw(
            (1.0 - cos_w0) / 2.0,
            1.0 - cos_w0,
            (1.0 - cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// Second-order high-pass section
    pub fn high_pass(frequency: f64, q: f64, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        Self::from_raw(
            (1.0 + cos_w0) / 2.0,
            -(1.0 + cos_w0),
            (1.0 + cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        )
    }

    /// All coefficients are finite numbers
    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }

    /// Both poles lie strictly inside the unit circle (stability triangle)
    pub fn is_stable(&self) -> bool {
        self.is_finite() && self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Complex frequency response at `frequency` Hz
    pub fn response(&self, frequency: f64, sample_rate: f64) -> Complex64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let numerator = self.b0 + z1 * self.b1 + z2 * self.b2;
        let denominator = 1.0 + z1 * self.a1 + z2 * self.a2;
        numerator / denominator
    }

    /// Linear magnitude response at `frequency` Hz
    pub fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.response(frequency, sample_rate).norm()
    }
}

/// Q of section `section` in a Butterworth cascade of even `order`
pub fn butterworth_q(order: usize, section: usize) -> f64 {
    let theta = (2 * section + 1) as f64 * PI / (2 * order) as f64;
    1.0 / (2.0 * theta.cos())
}

/// Reject sample rates the designer cannot handle
pub fn validate_sample_rate(sample_rate: f64) -> Result<()> {
    if !sample_rate.is_finite() || !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        return Err(EqError::InvalidSampleRate { sample_rate });
    }
    Ok(())
}

/// Clamp a design frequency safely below Nyquist
pub fn clamp_frequency(frequency: f64, sample_rate: f64) -> f64 {
    let limit = sample_rate * NYQUIST_GUARD;
    if frequency.is_nan() {
        return MIN_DESIGN_FREQ;
    }
    frequency.clamp(MIN_DESIGN_FREQ, limit)
}

fn checked(stage: &str, coefficients: CoefficientSet) -> Result<CoefficientSet> {
    if !coefficients.is_finite() {
        return Err(EqError::UnstableFilter {
            stage: stage.to_string(),
            reason: "non-finite coefficient".to_string(),
        });
    }
    if !coefficients.is_stable() {
        return Err(EqError::UnstableFilter {
            stage: stage.to_string(),
            reason: format!(
                "poles outside unit circle (a1 = {}, a2 = {})",
                coefficients.a1, coefficients.a2
            ),
        });
    }
    Ok(coefficients)
}

/// Design the peak section
pub fn make_peak_filter(settings: &ChainSettings, sample_rate: f64) -> Result<CoefficientSet> {
    validate_sample_rate(sample_rate)?;

    let frequency = clamp_frequency(settings.peak_freq as f64, sample_rate);
    let q = (settings.peak_quality as f64).max(MIN_Q);
    let gain = 10.0_f64.powf(settings.peak_gain_db as f64 / 20.0);

    checked("peak", CoefficientSet::peak(frequency, q, gain, sample_rate))
}

fn make_cut_filter(
    stage: &str,
    frequency: f64,
    slope: Slope,
    sample_rate: f64,
    section: fn(f64, f64, f64) -> CoefficientSet,
) -> Result<CutCoefficients> {
    validate_sample_rate(sample_rate)?;

    let frequency = clamp_frequency(frequency, sample_rate);
    let order = slope.order();
    let mut sections = [CoefficientSet::IDENTITY; MAX_CUT_SECTIONS];

    for (i, slot) in sections.iter_mut().take(slope.sections()).enumerate() {
        let q = butterworth_q(order, i);
        *slot = checked(stage, section(frequency, q, sample_rate))?;
    }

    Ok(sections)
}

/// Design the low-cut (high-pass) group
///
/// Only the first `low_cut_slope.sections()` entries are meaningful.
pub fn make_low_cut_filter(settings: &ChainSettings, sample_rate: f64) -> Result<CutCoefficients> {
    make_cut_filter(
        "low cut",
        settings.low_cut_freq as f64,
        settings.low_cut_slope,
        sample_rate,
        CoefficientSet::high_pass,
    )
}

/// Design the high-cut (low-pass) group
///
/// Only the first `high_cut_slope.sections()` entries are meaningful.
pub fn make_high_cut_filter(settings: &ChainSettings, sample_rate: f64) -> Result<CutCoefficients> {
    make_cut_filter(
        "high cut",
        settings.high_cut_freq as f64,
        settings.high_cut_slope,
        sample_rate,
        CoefficientSet::low_pass,
    )
}

/// Convert a linear magnitude to decibels, flooring silence at -200 dB
pub fn gain_to_db(gain: f64) -> f64 {
    if gain > 1.0e-10 {
        20.0 * gain.log10()
    } else {
        -200.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use test_case::test_case;

    fn settings_with_slopes(low: Slope, high: Slope) -> ChainSettings {
        ChainSettings {
            low_cut_freq: 200.0,
            high_cut_freq: 5000.0,
            low_cut_slope: low,
            high_cut_slope: high,
            ..Default::default()
        }
    }

    #[test]
    fn test_butterworth_q_values() {
        assert_relative_eq!(butterworth_q(2, 0), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_relative_eq!(butterworth_q(4, 0), 0.541_196_100_146_197, epsilon = 1e-12);
        assert_relative_eq!(butterworth_q(4, 1), 1.306_562_964_876_376_4, epsilon = 1e-12);
    }

    #[test]
    fn test_peak_gain_at_center() {
        let settings = ChainSettings {
            peak_freq: 1000.0,
            peak_gain_db: 12.0,
            peak_quality: 1.0,
            ..Default::default()
        };
        let peak = make_peak_filter(&settings, 48000.0).unwrap();
        assert_relative_eq!(gain_to_db(peak.magnitude(1000.0, 48000.0)), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_gain_peak_is_flat() {
        let peak = make_peak_filter(&ChainSettings::default(), 48000.0).unwrap();
        for freq in [20.0, 750.0, 10000.0] {
            assert_relative_eq!(peak.magnitude(freq, 48000.0), 1.0, epsilon = 1e-9);
        }
    }

    #[test_case(Slope::Db12, 1 ; "12 dB per octave")]
    #[test_case(Slope::Db24, 2 ; "24 dB per octave")]
    #[test_case(Slope::Db36, 3 ; "36 dB per octave")]
    #[test_case(Slope::Db48, 4 ; "48 dB per octave")]
    fn test_cut_sections_used(slope: Slope, active: usize) {
        let settings = settings_with_slopes(slope, slope);
        let low = make_low_cut_filter(&settings, 48000.0).unwrap();
        let high = make_high_cut_filter(&settings, 48000.0).unwrap();

        for i in 0..MAX_CUT_SECTIONS {
            assert_eq!(low[i] != CoefficientSet::IDENTITY, i < active);
            assert_eq!(high[i] != CoefficientSet::IDENTITY, i < active);
        }
    }

    #[test_case(Slope::Db12 ; "order 2")]
    #[test_case(Slope::Db24 ; "order 4")]
    #[test_case(Slope::Db36 ; "order 6")]
    #[test_case(Slope::Db48 ; "order 8")]
    fn test_cut_is_minus_3db_at_corner(slope: Slope) {
        let settings = settings_with_slopes(slope, slope);
        let low = make_low_cut_filter(&settings, 48000.0).unwrap();
        let magnitude: f64 = low
            .iter()
            .take(slope.sections())
            .map(|c| c.magnitude(200.0, 48000.0))
            .product();
        assert_relative_eq!(gain_to_db(magnitude), -3.0103, epsilon = 0.01);
    }

    #[test]
    fn test_high_cut_rolloff_per_octave() {
        let settings = ChainSettings {
            high_cut_freq: 1000.0,
            high_cut_slope: Slope::Db48,
            ..Default::default()
        };
        let high = make_high_cut_filter(&settings, 96000.0).unwrap();
        let response = |f: f64| -> f64 {
            gain_to_db(high.iter().map(|c| c.magnitude(f, 96000.0)).product())
        };
        // One octave apart, well above the corner: roughly 48 dB
        let drop = response(4000.0) - response(8000.0);
        assert!(drop > 44.0 && drop < 54.0, "drop = {}", drop);
    }

    #[test]
    fn test_frequency_above_nyquist_is_clamped() {
        let settings = ChainSettings {
            peak_freq: 20000.0,
            high_cut_freq: 20000.0,
            high_cut_slope: Slope::Db48,
            ..Default::default()
        };
        // 20 kHz is above Nyquist at 8 kHz sampling
        let peak = make_peak_filter(&settings, 8000.0).unwrap();
        let high = make_high_cut_filter(&settings, 8000.0).unwrap();
        assert!(peak.is_stable());
        assert!(high.iter().all(CoefficientSet::is_stable));
    }

    #[test]
    fn test_invalid_sample_rate_rejected() {
        let settings = ChainSettings::default();
        assert!(matches!(
            make_peak_filter(&settings, 0.0),
            Err(EqError::InvalidSampleRate { .. })
        ));
        assert!(make_low_cut_filter(&settings, f64::NAN).is_err());
    }

    #[test]
    fn test_unstable_set_detected() {
        let bad = CoefficientSet {
            a1: -2.5,
            a2: 1.2,
            ..CoefficientSet::IDENTITY
        };
        assert!(!bad.is_stable());
        assert!(checked("test", bad).is_err());
    }

    fn slope_strategy() -> impl Strategy<Value = Slope> {
        (0usize..4).prop_map(Slope::from_index)
    }

    proptest! {
        #[test]
        fn prop_all_designs_are_stable(
            low_cut_freq in 20.0f32..=20000.0,
            high_cut_freq in 20.0f32..=20000.0,
            peak_freq in 20.0f32..=20000.0,
            peak_gain_db in -24.0f32..=24.0,
            peak_quality in 0.1f32..=10.0,
            low_cut_slope in slope_strategy(),
            high_cut_slope in slope_strategy(),
            sample_rate in prop::sample::select(vec![44100.0, 48000.0, 88200.0, 96000.0, 192000.0]),
        ) {
            let settings = ChainSettings {
                low_cut_freq,
                high_cut_freq,
                peak_freq,
                peak_gain_db,
                peak_quality,
                low_cut_slope,
                high_cut_slope,
            };

            let peak = make_peak_filter(&settings, sample_rate).unwrap();
            prop_assert!(peak.is_stable());

            for set in make_low_cut_filter(&settings, sample_rate).unwrap() {
                prop_assert!(set.is_stable());
            }
            for set in make_high_cut_filter(&settings, sample_rate).unwrap() {
                prop_assert!(set.is_stable());
            }
        }
    }
}
