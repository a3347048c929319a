//! Response curve sampler
//!
//! Evaluates the magnitude of the latest published chain along a
//! log-spaced frequency axis for drawing. Runs on the UI side at the
//! refresh rate and only recomputes when a new publication appeared.

use std::sync::Arc;

use super::publisher::PublishedChain;
use crate::dsp::{gain_to_db, ChainCoefficients};

/// Lowest frequency on the response axis
pub const MIN_RESPONSE_FREQ: f64 = 20.0;

/// Highest frequency on the response axis
pub const MAX_RESPONSE_FREQ: f64 = 20000.0;

/// Decibel range mapped onto the display height
pub const DISPLAY_RANGE_DB: f64 = 24.0;

/// Frequency at `proportion` (0..1) along the 20 Hz - 20 kHz log axis
pub fn log_frequency(proportion: f64) -> f64 {
    MIN_RESPONSE_FREQ * (MAX_RESPONSE_FREQ / MIN_RESPONSE_FREQ).powf(proportion.clamp(0.0, 1.0))
}

/// Map a magnitude in dB onto a display of `height` pixels
///
/// +24 dB lands on 0 (top) and -24 dB on `height` (bottom); values outside
/// the range are clamped.
pub fn map_to_height(magnitude_db: f64, height: f64) -> f64 {
    let clamped = magnitude_db.clamp(-DISPLAY_RANGE_DB, DISPLAY_RANGE_DB);
    height * (DISPLAY_RANGE_DB - clamped) / (2.0 * DISPLAY_RANGE_DB)
}

/// Log-spaced frequencies from 20 Hz to 20 kHz
pub fn frequency_axis(points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![MIN_RESPONSE_FREQ],
        n => (0..n).map(|i| log_frequency(i as f64 / (n - 1) as f64)).collect(),
    }
}

/// Magnitudes in dB of `coefficients` at every frequency of `frequencies`
pub fn sample_curve(coefficients: &ChainCoefficients, sample_rate: f64, frequencies: &[f64]) -> Vec<f64> {
    frequencies
        .iter()
        .map(|&f| coefficients.magnitude_db(f, sample_rate))
        .collect()
}

/// Cached response curve of the latest publication
pub struct ResponseSampler {
    published: Arc<PublishedChain>,
    frequencies: Vec<f64>,
    magnitudes_db: Vec<f64>,
    version: Option<u64>,
}

impl ResponseSampler {
    pub fn new(published: Arc<PublishedChain>, points: usize) -> Self {
        let frequencies = frequency_axis(points);
        Self {
            published,
            magnitudes_db: vec![0.0; frequencies.len()],
            frequencies,
            version: None,
        }
    }

    /// Recompute the curve if a newer publication exists
    ///
    /// Returns whether the curve changed.
    pub fn refresh(&mut self) -> bool {
        let snapshot = self.published.load();
        if self.version == Some(snapshot.version) {
            return false;
        }

        for (magnitude, &frequency) in self.magnitudes_db.iter_mut().zip(&self.frequencies) {
            *magnitude = snapshot.coefficients.magnitude_db(frequency, snapshot.sample_rate);
        }
        self.version = Some(snapshot.version);
        true
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn magnitudes_db(&self) -> &[f64] {
        &self.magnitudes_db
    }

    /// (frequency, dB) pairs of the cached curve
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies.iter().copied().zip(self.magnitudes_db.iter().copied())
    }

    /// Cached curve mapped onto a display of `height` pixels
    pub fn heights(&self, height: f64) -> Vec<f64> {
        self.magnitudes_db
            .iter()
            .map(|&db| map_to_height(db, height))
            .collect()
    }

    /// Magnitude in dB at an arbitrary frequency, e.g. one pixel column
    pub fn magnitude_db_at(&self, frequency: f64) -> f64 {
        let snapshot = self.published.load();
        gain_to_db(snapshot.coefficients.magnitude(frequency, snapshot.sample_rate))
    }

    /// Version of the publication the cached curve was computed from
    pub fn version(&self) -> Option<u64> {
        self.version
    }
}
