//! Cascade EQ - three-section parametric equalizer engine
//!
//! Each audio channel runs through a fixed chain of nine biquad stages:
//! a Butterworth low cut of up to four sections, one peaking band, and a
//! Butterworth high cut of up to four sections.
//!
//! # Architecture
//!
//! - `params`: host-visible parameters and the shared store they live in
//! - `dsp`: coefficient design, the biquad stage and the filter chain
//! - `engine`: control-side publisher and render-side processor joined by
//!   wait-free coefficient queues, plus the response curve sampler
//! - `state`: versioned, checksummed parameter state blobs

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod params;
pub mod state;

pub use config::EngineConfig;
pub use dsp::{ChainCoefficients, CoefficientSet, FilterChain, FilterStage};
pub use engine::{create_engine, EqProcessor, PublisherThread, ResponseSampler, UpdatePublisher};
pub use error::{EqError, Result};
pub use params::{ChainSettings, ParamId, ParameterStore, Slope};
pub use state::EqState;
