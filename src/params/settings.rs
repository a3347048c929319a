//! Chain settings snapshot
//!
//! A `ChainSettings` value is the one consistent view of every user parameter
//! that a coefficient update is derived from.

use serde::{Deserialize, Serialize};

use super::layout::ParamId;

/// Number of slope choices (12, 24, 36 and 48 dB/Oct)
pub const NUM_SLOPES: usize = 4;

/// Cut filter steepness
///
/// Slope index `k` is realized with `k + 1` cascaded second-order sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slope {
    #[default]
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    /// All slopes in ascending order
    pub const ALL: [Slope; NUM_SLOPES] = [Slope::Db12, Slope::Db24, Slope::Db36, Slope::Db48];

    /// Build a slope from its choice index, clamping to the valid range
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(NUM_SLOPES - 1)]
    }

    /// Build a slope from a raw parameter value (the choice index as a float)
    pub fn from_raw(value: f32) -> Self {
        if value.is_nan() || value <= 0.0 {
            return Slope::Db12;
        }
        Self::from_index(value.round() as usize)
    }

    /// Choice index (0..=3)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Number of active second-order sections
    pub fn sections(self) -> usize {
        self.index() + 1
    }

    /// Butterworth order realized by this slope
    pub fn order(self) -> usize {
        2 * self.sections()
    }

    /// Steepness in dB per octave
    pub fn db_per_octave(self) -> u32 {
        12 * self.sections() as u32
    }
}

/// Snapshot of every user parameter at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainSettings {
    /// Low-cut (high-pass) corner in Hz (20-20000)
    pub low_cut_freq: f32,
    /// High-cut (low-pass) corner in Hz (20-20000)
    pub high_cut_freq: f32,
    /// Peak center frequency in Hz (20-20000)
    pub peak_freq: f32,
    /// Peak gain in dB (-24 to +24)
    pub peak_gain_db: f32,
    /// Peak Q (0.1 to 10.0)
    pub peak_quality: f32,
    pub low_cut_slope: Slope,
    pub high_cut_slope: Slope,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            low_cut_freq: ParamId::LowCutFreq.spec().default,
            high_cut_freq: ParamId::HighCutFreq.spec().default,
            peak_freq: ParamId::PeakFreq.spec().default,
            peak_gain_db: ParamId::PeakGain.spec().default,
            peak_quality: ParamId::PeakQuality.spec().default,
            low_cut_slope: Slope::default(),
            high_cut_slope: Slope::default(),
        }
    }
}

impl ChainSettings {
    /// Build settings from raw parameter values indexed by `ParamId`
    pub fn from_raw(values: &[f32; ParamId::COUNT]) -> Self {
        Self {
            low_cut_freq: values[ParamId::LowCutFreq.index()],
            high_cut_freq: values[ParamId::HighCutFreq.index()],
            peak_freq: values[ParamId::PeakFreq.index()],
            peak_gain_db: values[ParamId::PeakGain.index()],
            peak_quality: values[ParamId::PeakQuality.index()],
            low_cut_slope: Slope::from_raw(values[ParamId::LowCutSlope.index()]),
            high_cut_slope: Slope::from_raw(values[ParamId::HighCutSlope.index()]),
        }
    }

    /// Raw parameter values indexed by `ParamId`
    pub fn to_raw(&self) -> [f32; ParamId::COUNT] {
        let mut values = [0.0; ParamId::COUNT];
        for id in ParamId::ALL {
            values[id.index()] = self.get(id);
        }
        values
    }

    /// Raw value of a single parameter
    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::LowCutFreq => self.low_cut_freq,
            ParamId::HighCutFreq => self.high_cut_freq,
            ParamId::PeakFreq => self.peak_freq,
            ParamId::PeakGain => self.peak_gain_db,
            ParamId::PeakQuality => self.peak_quality,
            ParamId::LowCutSlope => self.low_cut_slope.index() as f32,
            ParamId::HighCutSlope => self.high_cut_slope.index() as f32,
        }
    }

    /// Copy of these settings with every field snapped into its declared range
    pub fn clamped(&self) -> Self {
        let mut values = self.to_raw();
        for id in ParamId::ALL {
            values[id.index()] = id.spec().range.snap(values[id.index()]);
        }
        Self::from_raw(&values)
    }
}
