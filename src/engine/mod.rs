//! Engine
//!
//! Splits the equalizer into a control half (`UpdatePublisher`) and a
//! render half (`EqProcessor`) joined by one wait-free coefficient queue
//! per channel, plus the response sampler used for drawing.

mod processor;
mod publisher;
mod response;

use std::sync::Arc;

use log::debug;
use rtrb::RingBuffer;

pub use processor::EqProcessor;
pub use publisher::{
    CoefficientUpdate, PublishedChain, PublishedSnapshot, PublisherStats, PublisherThread,
    UpdatePublisher,
};
pub use response::{
    frequency_axis, log_frequency, map_to_height, sample_curve, ResponseSampler, DISPLAY_RANGE_DB,
    MAX_RESPONSE_FREQ, MIN_RESPONSE_FREQ,
};

use crate::config::EngineConfig;
use crate::dsp::ChainCoefficients;
use crate::error::Result;
use crate::params::ParameterStore;
use publisher::{SharedSampleRate, UpdateGeneration};

/// Channels with their own filter chain
pub const NUM_CHANNELS: usize = 2;

/// Build a connected publisher / processor pair over `store`
///
/// The processor still needs `prepare` before the first block. The
/// publisher can be ticked directly or moved onto a `PublisherThread`.
pub fn create_engine(
    store: Arc<ParameterStore>,
    config: &EngineConfig,
) -> Result<(UpdatePublisher, EqProcessor)> {
    config.validate()?;

    let sample_rate = Arc::new(SharedSampleRate::new(config.sample_rate));
    let generation = Arc::new(UpdateGeneration::default());
    let initial = ChainCoefficients::design(&store.snapshot(), config.sample_rate)?;
    let published = Arc::new(PublishedChain::new(config.sample_rate, initial));

    let (producers, consumers): (Vec<_>, Vec<_>) = (0..NUM_CHANNELS)
        .map(|_| RingBuffer::<CoefficientUpdate>::new(config.queue_capacity))
        .unzip();

    debug!(
        "Created engine: {} channels, queue capacity {}",
        NUM_CHANNELS, config.queue_capacity
    );

    let publisher = UpdatePublisher::new(
        Arc::clone(&store),
        Arc::clone(&sample_rate),
        Arc::clone(&generation),
        producers,
        published,
    );
    let processor = EqProcessor::new(store, sample_rate, generation, consumers);
    Ok((publisher, processor))
}
