//! Stereo render processor
//!
//! The render-side half of the engine. Owns one `FilterChain` per channel
//! and the consumer end of each channel's coefficient queue. Nothing here
//! locks, allocates or logs once `prepare` has returned.

use std::sync::Arc;

use log::info;
use rtrb::Consumer;

use super::publisher::{CoefficientUpdate, SharedSampleRate, UpdateGeneration};
use super::NUM_CHANNELS;
use crate::dsp::{validate_sample_rate, ChainCoefficients, FilterChain};
use crate::error::{EqError, Result};
use crate::params::ParameterStore;
use crate::state::EqState;

/// Render-side half of the engine
pub struct EqProcessor {
    chains: [FilterChain<f32>; NUM_CHANNELS],
    consumers: Vec<Consumer<CoefficientUpdate>>,
    store: Arc<ParameterStore>,
    sample_rate: Arc<SharedSampleRate>,
    generation: Arc<UpdateGeneration>,
    /// Queued updates drawn before this generation are stale
    floor: u64,
    max_block_size: usize,
    prepared: bool,
}

impl EqProcessor {
    pub(crate) fn new(
        store: Arc<ParameterStore>,
        sample_rate: Arc<SharedSampleRate>,
        generation: Arc<UpdateGeneration>,
        consumers: Vec<Consumer<CoefficientUpdate>>,
    ) -> Self {
        Self {
            chains: std::array::from_fn(|_| FilterChain::new()),
            consumers,
            store,
            sample_rate,
            generation,
            floor: 0,
            max_block_size: 0,
            prepared: false,
        }
    }

    /// Prepare both channels for `sample_rate` and blocks up to `max_block_size`
    ///
    /// Called by the host outside the render callback. Designs coefficients
    /// from the current parameters so the first block is already correct,
    /// and discards queued updates designed for a previous rate.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize) -> Result<()> {
        validate_sample_rate(sample_rate)?;
        if max_block_size == 0 {
            return Err(EqError::InvalidConfig {
                reason: "max_block_size must be at least 1".to_string(),
            });
        }

        self.sample_rate.set(sample_rate);
        self.floor = self.generation.advance();

        let coefficients = ChainCoefficients::design(&self.store.snapshot(), sample_rate)?;
        for chain in self.chains.iter_mut() {
            chain.prepare(sample_rate, max_block_size)?;
            chain.apply(&coefficients);
        }
        for consumer in self.consumers.iter_mut() {
            while consumer.pop().is_ok() {}
        }

        self.max_block_size = max_block_size;
        self.prepared = true;
        // Republish so the visualization side follows the new rate
        self.store.mark_changed();

        info!("Prepared stereo EQ at {} Hz, max block {}", sample_rate, max_block_size);
        Ok(())
    }

    /// Restore parameters from a state blob and install them at once
    ///
    /// Called by the host outside the render callback, like `prepare`. The
    /// restored coefficients are in place before this returns, so the next
    /// block uses them even if the publisher is ticking on its own thread
    /// or has older updates queued. A blob that fails to parse, verify or
    /// design leaves the store and both chains untouched.
    pub fn restore_state(&mut self, bytes: &[u8]) -> Result<()> {
        let state = EqState::from_bytes(bytes)?;
        let settings = state.settings();
        let coefficients = if self.prepared {
            Some(ChainCoefficients::design(&settings, self.sample_rate())?)
        } else {
            None
        };

        // Marks the store changed so the published snapshot follows
        self.store.apply(&settings);
        self.floor = self.generation.advance();
        if let Some(coefficients) = coefficients {
            for chain in self.chains.iter_mut() {
                chain.apply(&coefficients);
            }
        }

        info!(
            "Restored {} parameters from state saved at {}",
            state.parameters.len(),
            state.saved_at
        );
        Ok(())
    }

    /// Install the newest queued update of each channel
    ///
    /// Called at the start of every block; older queued updates are
    /// superseded and never applied.
    fn apply_pending(&mut self) {
        let floor = self.floor;
        for (chain, consumer) in self.chains.iter_mut().zip(self.consumers.iter_mut()) {
            let mut latest = None;
            while let Ok(update) = consumer.pop() {
                if update.generation >= floor && update.sample_rate == chain.sample_rate() {
                    latest = Some(update);
                }
            }
            if let Some(update) = latest {
                chain.apply(&update.coefficients);
            }
        }
    }

    fn check_block(&self, len: usize) -> Result<()> {
        if !self.prepared {
            return Err(EqError::NotPrepared);
        }
        if len > self.max_block_size {
            return Err(EqError::BlockTooLarge {
                len,
                max: self.max_block_size,
            });
        }
        Ok(())
    }

    /// Process separate left and right buffers in place
    pub fn process_planar(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<()> {
        self.check_block(left.len().max(right.len()))?;
        self.apply_pending();
        self.chains[0].process(left);
        self.chains[1].process(right);
        Ok(())
    }

    /// Process any number of planar channels in place
    ///
    /// Channels 0 and 1 run through their own chains; any further channels
    /// are left untouched.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) -> Result<()> {
        let longest = channels.iter().map(|c| c.len()).max().unwrap_or(0);
        self.check_block(longest)?;
        self.apply_pending();
        for (chain, channel) in self.chains.iter_mut().zip(channels.iter_mut()) {
            chain.process(channel);
        }
        Ok(())
    }

    /// Process an interleaved buffer of `num_channels` channels in place
    ///
    /// The buffer must hold whole frames.
    pub fn process_interleaved(&mut self, samples: &mut [f32], num_channels: usize) -> Result<()> {
        if num_channels == 0 {
            return Ok(());
        }
        if samples.len() % num_channels != 0 {
            return Err(EqError::PartialFrame {
                len: samples.len(),
                channels: num_channels,
            });
        }
        self.check_block(samples.len() / num_channels)?;
        self.apply_pending();

        let active = num_channels.min(NUM_CHANNELS);
        for frame in samples.chunks_exact_mut(num_channels) {
            for (chain, sample) in self.chains[..active].iter_mut().zip(frame.iter_mut()) {
                *sample = chain.process_sample(*sample);
            }
        }
        for chain in self.chains[..active].iter_mut() {
            chain.snap_to_zero();
        }
        Ok(())
    }

    /// Clear filter history on both channels
    pub fn reset(&mut self) {
        for chain in self.chains.iter_mut() {
            chain.reset();
        }
    }

    /// Enable or disable the peak stage on both channels
    pub fn set_peak_enabled(&mut self, enabled: bool) {
        for chain in self.chains.iter_mut() {
            chain.set_peak_enabled(enabled);
        }
    }

    /// Chain of one channel
    pub fn chain(&self, channel: usize) -> Option<&FilterChain<f32>> {
        self.chains.get(channel)
    }

    pub fn sample_rate(&self) -> f64 {
        self.chains[0].sample_rate()
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }
}
