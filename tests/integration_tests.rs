//! Integration Tests
//!
//! End-to-end tests for the stereo EQ: parameter edits flowing through the
//! publisher into the render chains, state restore and the response curve.

use std::f64::consts::PI;
use std::sync::Arc;

use cascade_eq::dsp::{gain_to_db, ChainPosition};
use cascade_eq::engine::{create_engine, ResponseSampler};
use cascade_eq::params::{ChainSettings, ParamId, ParameterStore, Slope};
use cascade_eq::{ChainCoefficients, EngineConfig, EqState};

const SAMPLE_RATE: f64 = 48000.0;
const BLOCK_SIZE: usize = 512;

/// Helper to create a unit sine
fn create_sine(frequency: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * PI * frequency * i as f64 / SAMPLE_RATE).sin() as f32)
        .collect()
}

fn rms(samples: &[f32]) -> f64 {
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

fn scenario_settings() -> ChainSettings {
    ChainSettings {
        low_cut_freq: 100.0,
        high_cut_freq: 8000.0,
        peak_freq: 1000.0,
        peak_gain_db: 6.0,
        peak_quality: 1.0,
        low_cut_slope: Slope::Db24,
        high_cut_slope: Slope::Db12,
    }
}

/// Render a two-second sine through both channels in host-sized blocks and
/// return the gain in dB measured over the last second of each channel.
fn measure_gain(frequency: f64, settings: &ChainSettings) -> (f64, f64) {
    let store = Arc::new(ParameterStore::with_settings(settings));
    let (mut publisher, mut processor) = create_engine(Arc::clone(&store), &EngineConfig::default()).unwrap();
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    publisher.poll();

    let input = create_sine(frequency, 2 * SAMPLE_RATE as usize);
    let mut left = input.clone();
    let mut right = input.clone();
    for (l, r) in left.chunks_mut(BLOCK_SIZE).zip(right.chunks_mut(BLOCK_SIZE)) {
        processor.process_planar(l, r).unwrap();
    }

    let settled = SAMPLE_RATE as usize;
    let reference = rms(&input[settled..]);
    (
        gain_to_db(rms(&left[settled..]) / reference),
        gain_to_db(rms(&right[settled..]) / reference),
    )
}

// === End-to-End Tests ===

#[test]
fn test_scenario_peak_boosts_one_kilohertz() {
    let (left, right) = measure_gain(1000.0, &scenario_settings());
    assert!((left - 6.0).abs() < 0.1, "1 kHz came out at {:.3} dB", left);
    assert!((right - 6.0).abs() < 0.1, "1 kHz came out at {:.3} dB", right);
}

#[test]
fn test_scenario_low_cut_attenuates_fifty_hertz() {
    let (left, right) = measure_gain(50.0, &scenario_settings());
    assert!(left <= -24.0, "50 Hz came out at {:.3} dB", left);
    assert!(right <= -24.0, "50 Hz came out at {:.3} dB", right);
}

#[test]
fn test_rendered_gain_matches_analytic_response() {
    let settings = scenario_settings();
    let coefficients = ChainCoefficients::design(&settings, SAMPLE_RATE).unwrap();

    for frequency in [200.0, 3000.0, 12000.0] {
        let (measured, _) = measure_gain(frequency, &settings);
        let expected = coefficients.magnitude_db(frequency, SAMPLE_RATE);
        assert!(
            (measured - expected).abs() < 0.1,
            "{} Hz: measured {:.3} dB, expected {:.3} dB",
            frequency,
            measured,
            expected
        );
    }
}

#[test]
fn test_default_settings_are_transparent_in_band() {
    let (left, _) = measure_gain(1000.0, &ChainSettings::default());
    assert!(left.abs() < 0.05, "got {:.3} dB", left);
}

// === Publisher / Processor Tests ===

#[test]
fn test_burst_of_edits_applies_latest() {
    let store = Arc::new(ParameterStore::new());
    let (mut publisher, mut processor) = create_engine(Arc::clone(&store), &EngineConfig::default()).unwrap();
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    publisher.poll();
    let version = publisher.published().version();

    for gain in [-12.0, -6.0, 3.0, 9.5] {
        store.set(ParamId::PeakGain, gain);
    }
    for slope in Slope::ALL {
        store.set(ParamId::HighCutSlope, slope.index() as f32);
    }
    assert!(publisher.poll());
    assert_eq!(publisher.published().version(), version + 1);

    let mut left = vec![0.0; BLOCK_SIZE];
    let mut right = vec![0.0; BLOCK_SIZE];
    processor.process_planar(&mut left, &mut right).unwrap();

    let expected = ChainCoefficients::design(&store.snapshot(), SAMPLE_RATE).unwrap();
    let chain = processor.chain(1).unwrap();
    assert_eq!(*chain.stage(ChainPosition::Peak, 0).unwrap().coefficients(), expected.peak);
    assert_eq!(chain.active_sections(ChainPosition::HighCut), 4);
}

#[test]
fn test_state_restore_takes_effect_before_next_block() {
    let saved = EqState::from_settings(&scenario_settings()).to_bytes().unwrap();

    let store = Arc::new(ParameterStore::new());
    let (mut publisher, mut processor) = create_engine(Arc::clone(&store), &EngineConfig::default()).unwrap();
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    publisher.poll();

    processor.restore_state(&saved).unwrap();
    assert_eq!(store.snapshot(), scenario_settings());

    let mut left = vec![0.0; 64];
    let mut right = vec![0.0; 64];
    processor.process_planar(&mut left, &mut right).unwrap();

    let expected = ChainCoefficients::design(&scenario_settings(), SAMPLE_RATE).unwrap();
    let chain = processor.chain(0).unwrap();
    assert_eq!(chain.active_sections(ChainPosition::LowCut), 2);
    assert_eq!(chain.active_sections(ChainPosition::HighCut), 1);
    for i in 0..2 {
        let installed = chain.stage(ChainPosition::LowCut, i).unwrap().coefficients();
        assert_eq!(*installed, expected.low_cut[i]);
    }
}

#[test]
fn test_corrupt_state_leaves_engine_untouched() {
    let store = Arc::new(ParameterStore::with_settings(&scenario_settings()));
    let (mut publisher, mut processor) = create_engine(Arc::clone(&store), &EngineConfig::default()).unwrap();
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    publisher.poll();
    let before = publisher.published().load();

    let err = processor.restore_state(b"{\"version\": 1}").unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(store.snapshot(), scenario_settings());
    assert!(!publisher.poll());
    assert_eq!(publisher.published().load(), before);
}

#[test]
fn test_saved_state_round_trips_between_engines() {
    let store = Arc::new(ParameterStore::with_settings(&scenario_settings()));
    let (publisher, _processor) = create_engine(Arc::clone(&store), &EngineConfig::default()).unwrap();
    let bytes = publisher.save_state().unwrap();

    let other = Arc::new(ParameterStore::new());
    let (mut other_publisher, mut other_processor) =
        create_engine(Arc::clone(&other), &EngineConfig::default()).unwrap();
    other_processor.restore_state(&bytes).unwrap();
    assert_eq!(other.snapshot(), scenario_settings());

    // Not yet prepared: the restored values are picked up by prepare
    other_processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    assert!(other_publisher.poll());
    let expected = ChainCoefficients::design(&scenario_settings(), SAMPLE_RATE).unwrap();
    assert_eq!(other_publisher.published().load().coefficients, expected);
}

// === Response Curve Tests ===

#[test]
fn test_response_curve_shape() {
    let store = Arc::new(ParameterStore::with_settings(&scenario_settings()));
    let (mut publisher, mut processor) = create_engine(Arc::clone(&store), &EngineConfig::default()).unwrap();
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    publisher.poll();

    let mut sampler = ResponseSampler::new(publisher.published(), 256);
    assert!(sampler.refresh());

    let points: Vec<(f64, f64)> = sampler.points().collect();
    assert_eq!(points.len(), 256);
    assert!((points[0].0 - 20.0).abs() < 1e-9);
    assert!((points[255].0 - 20000.0).abs() < 1e-6);

    // Deep cut at the bottom, boost around the peak, roll-off at the top
    assert!(points[0].1 < -40.0);
    assert!((sampler.magnitude_db_at(1000.0) - 6.0).abs() < 0.1);
    assert!(points[255].1 < -10.0);

    let heights = sampler.heights(100.0);
    assert!(heights.iter().all(|&h| (0.0..=100.0).contains(&h)));
}

#[test]
fn test_chain_response_matches_sampler() {
    let store = Arc::new(ParameterStore::with_settings(&scenario_settings()));
    let (mut publisher, mut processor) = create_engine(Arc::clone(&store), &EngineConfig::default()).unwrap();
    processor.prepare(SAMPLE_RATE, BLOCK_SIZE).unwrap();
    publisher.poll();

    let mut left = vec![0.0; 16];
    let mut right = vec![0.0; 16];
    processor.process_planar(&mut left, &mut right).unwrap();

    let sampler = ResponseSampler::new(publisher.published(), 2);
    let chain = processor.chain(0).unwrap();
    for frequency in [50.0, 1000.0, 10000.0] {
        let from_chain = gain_to_db(chain.magnitude_response(frequency, SAMPLE_RATE));
        assert!((from_chain - sampler.magnitude_db_at(frequency)).abs() < 1e-9);
    }
}
