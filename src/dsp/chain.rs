//! Filter chain (one per audio channel)
//!
//! Fixed topology of nine biquad stages, always applied in this order:
//! 1. Low cut sections 0..3 (high-pass)
//! 2. Peak
//! 3. High cut sections 0..3 (low-pass)
//!
//! The slope of each cut group decides how many of its four sections are
//! active. Inactive sections keep their slot and act as identity, so the
//! order of operations never depends on the slope.

use log::warn;
use num_traits::Float;

use super::coefficients::{
    gain_to_db, make_high_cut_filter, make_low_cut_filter, make_peak_filter,
    validate_sample_rate, CoefficientSet, CutCoefficients, MAX_CUT_SECTIONS,
};
use super::stage::FilterStage;
use crate::error::Result;
use crate::params::ChainSettings;

/// Total number of stages in a chain
pub const NUM_STAGES: usize = 2 * MAX_CUT_SECTIONS + 1;

/// Stage group within the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPosition {
    LowCut,
    Peak,
    HighCut,
}

/// Every coefficient a chain needs, designed from one settings snapshot
///
/// This is a plain value: it is copied through the hand-off queue into the
/// render thread, so the reader sees either the previous set or this one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainCoefficients {
    pub low_cut: CutCoefficients,
    /// Active low cut sections (1..=4)
    pub low_cut_sections: usize,
    pub peak: CoefficientSet,
    pub high_cut: CutCoefficients,
    /// Active high cut sections (1..=4)
    pub high_cut_sections: usize,
}

impl Default for ChainCoefficients {
    fn default() -> Self {
        Self::identity()
    }
}

impl ChainCoefficients {
    /// Coefficients that leave the signal unchanged
    pub fn identity() -> Self {
        Self {
            low_cut: [CoefficientSet::IDENTITY; MAX_CUT_SECTIONS],
            low_cut_sections: 1,
            peak: CoefficientSet::IDENTITY,
            high_cut: [CoefficientSet::IDENTITY; MAX_CUT_SECTIONS],
            high_cut_sections: 1,
        }
    }

    /// Design all nine stages from one snapshot
    ///
    /// Either every stage is designed successfully or an error is returned
    /// and nothing should be installed.
    pub fn design(settings: &ChainSettings, sample_rate: f64) -> Result<Self> {
        Ok(Self {
            low_cut: make_low_cut_filter(settings, sample_rate)?,
            low_cut_sections: settings.low_cut_slope.sections(),
            peak: make_peak_filter(settings, sample_rate)?,
            high_cut: make_high_cut_filter(settings, sample_rate)?,
            high_cut_sections: settings.high_cut_slope.sections(),
        })
    }

    /// Linear magnitude of the whole chain at `frequency` Hz
    ///
    /// Section counts above `MAX_CUT_SECTIONS` count as all sections active,
    /// as they do when the set is installed on a chain.
    pub fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64 {
        let low: f64 = self.low_cut[..self.low_cut_sections.min(MAX_CUT_SECTIONS)]
            .iter()
            .map(|c| c.magnitude(frequency, sample_rate))
            .product();
        let high: f64 = self.high_cut[..self.high_cut_sections.min(MAX_CUT_SECTIONS)]
            .iter()
            .map(|c| c.magnitude(frequency, sample_rate))
            .product();
        low * self.peak.magnitude(frequency, sample_rate) * high
    }

    /// Magnitude of the whole chain in dB
    pub fn magnitude_db(&self, frequency: f64, sample_rate: f64) -> f64 {
        gain_to_db(self.magnitude(frequency, sample_rate))
    }
}

/// Cascade of low cut, peak and high cut stages for one channel
#[derive(Debug, Clone)]
pub struct FilterChain<T: Float = f32> {
    low_cut: [FilterStage<T>; MAX_CUT_SECTIONS],
    peak: FilterStage<T>,
    high_cut: [FilterStage<T>; MAX_CUT_SECTIONS],
    peak_enabled: bool,
    sample_rate: f64,
    max_block_size: usize,
    prepared: bool,
}

impl<T: Float> Default for FilterChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> FilterChain<T> {
    /// Create an unprepared chain with identity coefficients
    pub fn new() -> Self {
        let mut chain = Self {
            low_cut: std::array::from_fn(|_| FilterStage::new()),
            peak: FilterStage::new(),
            high_cut: std::array::from_fn(|_| FilterStage::new()),
            peak_enabled: true,
            sample_rate: 0.0,
            max_block_size: 0,
            prepared: false,
        };
        chain.apply(&ChainCoefficients::identity());
        chain
    }

    /// Prepare for processing at `sample_rate` with blocks of up to `max_block_size`
    ///
    /// Clears all stage history. Must be called again whenever the sample
    /// rate or the maximum block size changes.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        validate_sample_rate(sample_rate)?;
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.reset();
        self.prepared = true;
        Ok(())
    }

    /// Design and install coefficients for `settings` in one step
    ///
    /// On a design failure the previous coefficients stay in effect.
    pub fn update_coefficients(&mut self, settings: &ChainSettings) -> Result<()> {
        debug_assert!(self.prepared, "FilterChain::update_coefficients before prepare");
        match ChainCoefficients::design(settings, self.sample_rate) {
            Ok(coefficients) => {
                self.apply(&coefficients);
                Ok(())
            }
            Err(e) => {
                warn!("Keeping previous coefficients: {}", e);
                Err(e)
            }
        }
    }

    /// Install a designed coefficient set and the matching bypass flags
    pub fn apply(&mut self, coefficients: &ChainCoefficients) {
        Self::update_cut(&mut self.low_cut, &coefficients.low_cut, coefficients.low_cut_sections);
        self.peak.set_coefficients(&coefficients.peak);
        self.peak.set_bypassed(!self.peak_enabled);
        Self::update_cut(&mut self.high_cut, &coefficients.high_cut, coefficients.high_cut_sections);
    }

    fn update_cut(
        stages: &mut [FilterStage<T>; MAX_CUT_SECTIONS],
        coefficients: &CutCoefficients,
        active: usize,
    ) {
        for (i, stage) in stages.iter_mut().enumerate() {
            let enabled = i < active;
            if enabled {
                stage.set_coefficients(&coefficients[i]);
            }
            stage.set_bypassed(!enabled);
        }
    }

    /// Run `block` through all nine stages in place
    pub fn process(&mut self, block: &mut [T]) {
        debug_assert!(self.prepared, "FilterChain::process before prepare");
        debug_assert!(
            block.len() <= self.max_block_size,
            "block of {} exceeds prepared maximum {}",
            block.len(),
            self.max_block_size
        );

        for stage in self.low_cut.iter_mut() {
            stage.process_block(block);
        }
        self.peak.process_block(block);
        for stage in self.high_cut.iter_mut() {
            stage.process_block(block);
        }
    }

    /// Run a single sample through all nine stages
    ///
    /// Produces exactly what `process` produces for the same sample sequence.
    #[inline]
    pub fn process_sample(&mut self, input: T) -> T {
        let mut output = input;
        for stage in self.low_cut.iter_mut().chain(std::iter::once(&mut self.peak)) {
            if !stage.is_bypassed() {
                output = stage.process_sample(output);
            }
        }
        for stage in self.high_cut.iter_mut() {
            if !stage.is_bypassed() {
                output = stage.process_sample(output);
            }
        }
        output
    }

    /// Linear magnitude of every non-bypassed stage at `frequency` Hz
    ///
    /// Read-only; used for visualization.
    pub fn magnitude_response(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.stages()
            .filter(|stage| !stage.is_bypassed())
            .map(|stage| stage.magnitude(frequency, sample_rate))
            .product()
    }

    /// Stages in processing order
    pub fn stages(&self) -> impl Iterator<Item = &FilterStage<T>> {
        self.low_cut
            .iter()
            .chain(std::iter::once(&self.peak))
            .chain(self.high_cut.iter())
    }

    /// Access one stage of a group (`index` is ignored for the peak)
    pub fn stage(&self, position: ChainPosition, index: usize) -> Option<&FilterStage<T>> {
        match position {
            ChainPosition::LowCut => self.low_cut.get(index),
            ChainPosition::Peak => Some(&self.peak),
            ChainPosition::HighCut => self.high_cut.get(index),
        }
    }

    /// Number of non-bypassed stages in a group
    pub fn active_sections(&self, position: ChainPosition) -> usize {
        match position {
            ChainPosition::LowCut => self.low_cut.iter().filter(|s| !s.is_bypassed()).count(),
            ChainPosition::Peak => usize::from(!self.peak.is_bypassed()),
            ChainPosition::HighCut => self.high_cut.iter().filter(|s| !s.is_bypassed()).count(),
        }
    }

    /// Globally enable or disable the peak stage
    pub fn set_peak_enabled(&mut self, enabled: bool) {
        self.peak_enabled = enabled;
        self.peak.set_bypassed(!enabled);
    }

    pub fn is_peak_enabled(&self) -> bool {
        self.peak_enabled
    }

    /// Flush decayed history of the active stages
    ///
    /// `process` does this at the end of every block; callers driving
    /// `process_sample` call it once per block themselves.
    pub fn snap_to_zero(&mut self) {
        for stage in self.low_cut.iter_mut().chain(std::iter::once(&mut self.peak)) {
            if !stage.is_bypassed() {
                stage.snap_to_zero();
            }
        }
        for stage in self.high_cut.iter_mut() {
            if !stage.is_bypassed() {
                stage.snap_to_zero();
            }
        }
    }

    /// Clear the history of every stage
    pub fn reset(&mut self) {
        for stage in self.low_cut.iter_mut() {
            stage.reset();
        }
        self.peak.reset();
        for stage in self.high_cut.iter_mut() {
            stage.reset();
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }
}
