//! Filter DSP
//!
//! Coefficient design, the single biquad stage and the nine-stage chain
//! (low cut, peak, high cut) each audio channel runs through.

mod chain;
mod coefficients;
mod stage;

pub use chain::{ChainCoefficients, ChainPosition, FilterChain, NUM_STAGES};
pub use coefficients::{
    butterworth_q, clamp_frequency, gain_to_db, make_high_cut_filter, make_low_cut_filter,
    make_peak_filter, validate_sample_rate, CoefficientSet, CutCoefficients, MAX_CUT_SECTIONS,
    MAX_SAMPLE_RATE, MIN_SAMPLE_RATE,
};
pub use stage::FilterStage;
