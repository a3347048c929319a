//! Parameter layout
//!
//! Names, ranges and defaults of the seven host-visible parameters, plus the
//! normalisation and display rules the control surface uses.

use crate::error::{EqError, Result};

/// Choice names of the two slope parameters
pub const SLOPE_CHOICES: [&str; 4] = ["12 dB/Oct", "24 dB/Oct", "36 dB/Oct", "48 dB/Oct"];

/// Identifier of a host-visible parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamId {
    LowCutFreq,
    HighCutFreq,
    PeakFreq,
    PeakGain,
    PeakQuality,
    LowCutSlope,
    HighCutSlope,
}

impl ParamId {
    /// Number of parameters
    pub const COUNT: usize = 7;

    /// All parameters in layout order
    pub const ALL: [ParamId; ParamId::COUNT] = [
        ParamId::LowCutFreq,
        ParamId::HighCutFreq,
        ParamId::PeakFreq,
        ParamId::PeakGain,
        ParamId::PeakQuality,
        ParamId::LowCutSlope,
        ParamId::HighCutSlope,
    ];

    /// Position in raw value arrays
    pub fn index(self) -> usize {
        self as usize
    }

    /// Host-visible parameter name
    pub fn name(self) -> &'static str {
        match self {
            ParamId::LowCutFreq => "LowCut Freq",
            ParamId::HighCutFreq => "HighCut Freq",
            ParamId::PeakFreq => "Peak Freq",
            ParamId::PeakGain => "Peak Gain",
            ParamId::PeakQuality => "Peak Quality",
            ParamId::LowCutSlope => "LowCut Slope",
            ParamId::HighCutSlope => "HighCut Slope",
        }
    }

    /// Look up a parameter by its host-visible name
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == name)
            .ok_or_else(|| EqError::UnknownParameter {
                name: name.to_string(),
            })
    }

    /// Declared range, default and presentation of this parameter
    pub fn spec(self) -> ParamSpec {
        match self {
            ParamId::LowCutFreq => ParamSpec::float(self, ParamRange::new(20.0, 20000.0, 1.0, 0.25), 20.0, "Hz"),
            ParamId::HighCutFreq => ParamSpec::float(self, ParamRange::new(20.0, 20000.0, 1.0, 0.25), 20000.0, "Hz"),
            ParamId::PeakFreq => ParamSpec::float(self, ParamRange::new(20.0, 20000.0, 1.0, 0.5), 750.0, "Hz"),
            ParamId::PeakGain => ParamSpec::float(self, ParamRange::new(-24.0, 24.0, 0.5, 1.0), 0.0, "dB"),
            ParamId::PeakQuality => ParamSpec::float(self, ParamRange::new(0.1, 10.0, 0.05, 1.0), 1.0, ""),
            ParamId::LowCutSlope | ParamId::HighCutSlope => ParamSpec::choice(self, &SLOPE_CHOICES, 0),
        }
    }
}

/// Normalisable value range with snapping interval and skew
///
/// With a skew below 1.0 the lower end of the range occupies more of the
/// normalised 0..1 travel, which suits logarithmic quantities like frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    /// Snapping step (0.0 disables snapping)
    pub interval: f32,
    pub skew: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32, interval: f32, skew: f32) -> Self {
        Self {
            min,
            max,
            interval,
            skew,
        }
    }

    /// Clamp into the range and snap to the nearest interval step
    pub fn snap(&self, value: f32) -> f32 {
        let value = if value.is_nan() { self.min } else { value };
        let clamped = value.clamp(self.min, self.max);
        if self.interval > 0.0 {
            let steps = ((clamped - self.min) / self.interval).round();
            (self.min + steps * self.interval).clamp(self.min, self.max)
        } else {
            clamped
        }
    }

    /// Map a plain value onto 0..1
    pub fn to_normalised(&self, value: f32) -> f32 {
        let proportion = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        if (self.skew - 1.0).abs() > f32::EPSILON && proportion > 0.0 {
            proportion.powf(self.skew)
        } else {
            proportion
        }
    }

    /// Map 0..1 back onto a snapped plain value
    pub fn from_normalised(&self, proportion: f32) -> f32 {
        let mut proportion = proportion.clamp(0.0, 1.0);
        if (self.skew - 1.0).abs() > f32::EPSILON && proportion > 0.0 {
            proportion = proportion.powf(1.0 / self.skew);
        }
        self.snap(self.min + (self.max - self.min) * proportion)
    }
}

/// How a parameter is presented to the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    /// Continuous value with a unit suffix
    Float { unit: &'static str },
    /// Discrete choice stored as its index
    Choice { choices: &'static [&'static str] },
}

/// Full description of one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub id: ParamId,
    pub range: ParamRange,
    pub default: f32,
    pub kind: ParamKind,
}

impl ParamSpec {
    fn float(id: ParamId, range: ParamRange, default: f32, unit: &'static str) -> Self {
        Self {
            id,
            range,
            default,
            kind: ParamKind::Float { unit },
        }
    }

    fn choice(id: ParamId, choices: &'static [&'static str], default: usize) -> Self {
        Self {
            id,
            range: ParamRange::new(0.0, (choices.len() - 1) as f32, 1.0, 1.0),
            default: default as f32,
            kind: ParamKind::Choice { choices },
        }
    }

    /// Text shown on the control for `value`
    ///
    /// Values above 999 are shown in thousands with two decimals, e.g. "1.50 kHz".
    pub fn display_string(&self, value: f32) -> String {
        match self.kind {
            ParamKind::Choice { choices } => {
                let index = self.range.snap(value) as usize;
                choices[index.min(choices.len() - 1)].to_string()
            }
            ParamKind::Float { unit } => {
                let kilo = value > 999.0;
                let shown = if kilo { value / 1000.0 } else { value };
                let decimals = if kilo || unit.is_empty() { 2 } else { 0 };
                let mut text = format!("{:.*}", decimals, shown);
                if !unit.is_empty() {
                    text.push(' ');
                    if kilo {
                        text.push('k');
                    }
                    text.push_str(unit);
                }
                text
            }
        }
    }
}
