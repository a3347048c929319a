//! Update publisher
//!
//! Runs on the control side. Watches the parameter store's changed flag,
//! designs a fresh coefficient set from the latest snapshot and hands it to
//! each channel's render chain through a wait-free SPSC queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use parking_lot::RwLock;
use rtrb::{Producer, PushError};

use crate::config::EngineConfig;
use crate::dsp::{validate_sample_rate, ChainCoefficients};
use crate::error::Result;
use crate::params::ParameterStore;
use crate::state::EqState;

/// One designed update travelling to the render thread
///
/// Tagged with the sample rate it was designed for and the generation it
/// was drawn at, so the render side can discard updates that predate a
/// `prepare` or a state restore.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientUpdate {
    pub generation: u64,
    pub sample_rate: f64,
    pub coefficients: ChainCoefficients,
}

/// Monotonic counter ordering publications against render-side installs
///
/// The publisher draws a generation before reading the parameter snapshot.
/// The processor draws one after installing coefficients itself and ignores
/// queued updates drawn earlier, since those may carry an older snapshot.
#[derive(Debug, Default)]
pub(crate) struct UpdateGeneration(AtomicU64);

impl UpdateGeneration {
    pub(crate) fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Sample rate shared between the publisher and the processor
#[derive(Debug)]
pub(crate) struct SharedSampleRate(AtomicU64);

impl SharedSampleRate {
    pub(crate) fn new(sample_rate: f64) -> Self {
        Self(AtomicU64::new(sample_rate.to_bits()))
    }

    pub(crate) fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, sample_rate: f64) {
        self.0.store(sample_rate.to_bits(), Ordering::Release);
    }
}

/// Latest published coefficients, as seen by the visualization side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishedSnapshot {
    /// Incremented on every successful publication
    pub version: u64,
    pub sample_rate: f64,
    pub coefficients: ChainCoefficients,
}

/// Monitor around the most recent publication
///
/// Readers copy the whole snapshot under the read lock, so they never see a
/// half-written update. The render thread never touches this.
#[derive(Debug)]
pub struct PublishedChain {
    inner: RwLock<PublishedSnapshot>,
}

impl PublishedChain {
    pub(crate) fn new(sample_rate: f64, coefficients: ChainCoefficients) -> Self {
        Self {
            inner: RwLock::new(PublishedSnapshot {
                version: 0,
                sample_rate,
                coefficients,
            }),
        }
    }

    /// Copy of the latest publication
    pub fn load(&self) -> PublishedSnapshot {
        *self.inner.read()
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    fn store(&self, sample_rate: f64, coefficients: ChainCoefficients) -> u64 {
        let mut inner = self.inner.write();
        inner.version += 1;
        inner.sample_rate = sample_rate;
        inner.coefficients = coefficients;
        inner.version
    }
}

/// Publication counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    /// Coefficient sets designed and published
    pub published: u64,
    /// Updates skipped because the design failed
    pub skipped: u64,
    /// Pushes deferred because a channel queue was full
    pub deferred: u64,
}

/// Control-side half of the engine
pub struct UpdatePublisher {
    store: Arc<ParameterStore>,
    sample_rate: Arc<SharedSampleRate>,
    generation: Arc<UpdateGeneration>,
    producers: Vec<Producer<CoefficientUpdate>>,
    pending: Vec<Option<CoefficientUpdate>>,
    published: Arc<PublishedChain>,
    stats: PublisherStats,
}

impl UpdatePublisher {
    pub(crate) fn new(
        store: Arc<ParameterStore>,
        sample_rate: Arc<SharedSampleRate>,
        generation: Arc<UpdateGeneration>,
        producers: Vec<Producer<CoefficientUpdate>>,
        published: Arc<PublishedChain>,
    ) -> Self {
        let pending = vec![None; producers.len()];
        Self {
            store,
            sample_rate,
            generation,
            producers,
            pending,
            published,
            stats: PublisherStats::default(),
        }
    }

    /// One periodic tick
    ///
    /// Retries deferred pushes, then test-and-clears the store's changed flag
    /// and publishes the latest snapshot if it was set. Any number of edits
    /// between two ticks collapse into one design. Returns whether a new
    /// coefficient set was published.
    pub fn poll(&mut self) -> bool {
        self.flush_pending();
        if !self.store.take_changed() {
            return false;
        }
        self.publish_now().is_ok()
    }

    /// Design from the current snapshot and publish immediately
    ///
    /// On a design failure nothing is published and the previous
    /// coefficients stay in effect everywhere.
    pub fn publish_now(&mut self) -> Result<u64> {
        // Drawn before the snapshot is read
        let generation = self.generation.advance();
        let settings = self.store.snapshot();
        let sample_rate = self.sample_rate.get();

        let coefficients = match ChainCoefficients::design(&settings, sample_rate) {
            Ok(coefficients) => coefficients,
            Err(e) => {
                self.stats.skipped += 1;
                warn!("Skipping coefficient update: {}", e);
                return Err(e);
            }
        };

        let update = CoefficientUpdate {
            generation,
            sample_rate,
            coefficients,
        };
        // A newer update replaces anything still waiting for queue space
        for pending in self.pending.iter_mut() {
            *pending = Some(update);
        }
        self.flush_pending();

        let version = self.published.store(sample_rate, coefficients);
        self.stats.published += 1;
        debug!(
            "Published coefficients v{} at {} Hz (low cut {} sections, high cut {} sections)",
            version, sample_rate, coefficients.low_cut_sections, coefficients.high_cut_sections
        );
        Ok(version)
    }

    fn flush_pending(&mut self) {
        for (channel, (producer, pending)) in self
            .producers
            .iter_mut()
            .zip(self.pending.iter_mut())
            .enumerate()
        {
            if let Some(update) = pending.take() {
                if let Err(PushError::Full(update)) = producer.push(update) {
                    self.stats.deferred += 1;
                    warn!("Coefficient queue for channel {} is full, retrying next tick", channel);
                    *pending = Some(update);
                }
            }
        }
    }

    /// Whether any channel still has an update waiting for queue space
    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(Option::is_some)
    }

    /// Design for a new sample rate on the next tick
    ///
    /// The render side must still be prepared at the same rate; updates
    /// designed for any other rate are discarded there.
    pub fn set_sample_rate(&self, sample_rate: f64) -> Result<()> {
        validate_sample_rate(sample_rate)?;
        self.sample_rate.set(sample_rate);
        self.store.mark_changed();
        Ok(())
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate.get()
    }

    /// Serialize the current parameters
    pub fn save_state(&self) -> Result<Vec<u8>> {
        EqState::capture(&self.store).to_bytes()
    }

    /// Return every parameter to its default and republish
    pub fn reset_all_parameters(&mut self) -> Result<u64> {
        self.store.reset_all();
        self.store.take_changed();
        self.publish_now()
    }

    pub fn store(&self) -> &Arc<ParameterStore> {
        &self.store
    }

    /// Handle for readers of the latest publication
    pub fn published(&self) -> Arc<PublishedChain> {
        Arc::clone(&self.published)
    }

    pub fn stats(&self) -> PublisherStats {
        self.stats
    }
}

/// Background thread ticking an `UpdatePublisher` at a fixed rate
pub struct PublisherThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<UpdatePublisher>>,
}

impl PublisherThread {
    /// Move `publisher` onto its own thread, ticking at the configured refresh rate
    pub fn spawn_with_config(publisher: UpdatePublisher, config: &EngineConfig) -> Result<Self> {
        Self::spawn(publisher, config.refresh_interval())
    }

    /// Move `publisher` onto its own thread, polling every `interval`
    pub fn spawn(mut publisher: UpdatePublisher, interval: Duration) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("eq-publisher".to_string())
            .spawn(move || {
                debug!("Publisher thread started ({:?} interval)", interval);
                while !flag.load(Ordering::Acquire) {
                    publisher.poll();
                    thread::sleep(interval);
                }
                // Last edits made before the stop request
                publisher.poll();
                debug!("Publisher thread stopped");
                publisher
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop ticking and hand the publisher back
    pub fn stop(mut self) -> Option<UpdatePublisher> {
        self.stop.store(true, Ordering::Release);
        self.handle.take().and_then(|handle| handle.join().ok())
    }
}

impl Drop for PublisherThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
