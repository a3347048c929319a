//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{debug, info};

use super::wav::{read_wav, write_wav};
use super::ParamArgs;
use crate::config::EngineConfig;
use crate::dsp::ChainCoefficients;
use crate::engine::{create_engine, frequency_axis, sample_curve};
use crate::params::{ParamId, ParamKind, ParameterStore};
use crate::state::EqState;

/// Load the config file if one was given, otherwise the defaults
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path).with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Run `input` through the stereo EQ and write the result to `output`.
pub fn render(
    input: &Path,
    output: &Path,
    block_size: Option<usize>,
    save_state: Option<&Path>,
    params: &ParamArgs,
    config: &EngineConfig,
) -> Result<()> {
    let settings = params.settings().context("Failed to resolve parameters")?;
    let audio = read_wav(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let channels = audio.channels();
    if channels == 0 {
        bail!("{} has no channels", input.display());
    }

    let block_size = block_size.unwrap_or(config.max_block_size);
    if block_size == 0 {
        bail!("block size must be at least 1");
    }

    let config = EngineConfig {
        sample_rate: audio.spec.sample_rate as f64,
        max_block_size: block_size,
        ..config.clone()
    };
    info!(
        "Rendering {} ({} ch, {} Hz, {} frames) in blocks of {}",
        input.display(),
        channels,
        audio.spec.sample_rate,
        audio.frames(),
        block_size
    );
    debug!("Settings: {:?}", settings);

    let store = Arc::new(ParameterStore::with_settings(&settings));
    let (_publisher, mut processor) = create_engine(Arc::clone(&store), &config)?;
    processor.prepare(config.sample_rate, block_size)?;

    let mut samples = audio.samples;
    for block in samples.chunks_mut(block_size * channels) {
        processor.process_interleaved(block, channels)?;
    }

    write_wav(output, audio.spec, &samples).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Rendered: {} -> {}", input.display(), output.display());

    if let Some(path) = save_state {
        EqState::capture(&store).save_to_file(path)?;
        println!("State saved: {}", path.display());
    }

    Ok(())
}

/// Print the response curve as `frequency_hz,magnitude_db` CSV.
pub fn response(
    points: Option<usize>,
    sample_rate: Option<f64>,
    params: &ParamArgs,
    config: &EngineConfig,
) -> Result<()> {
    let settings = params.settings().context("Failed to resolve parameters")?;
    let points = points.unwrap_or(config.response_points);
    let sample_rate = sample_rate.unwrap_or(config.sample_rate);

    let coefficients = ChainCoefficients::design(&settings, sample_rate)?;
    let frequencies = frequency_axis(points);
    let magnitudes = sample_curve(&coefficients, sample_rate, &frequencies);

    println!("frequency_hz,magnitude_db");
    for (frequency, magnitude) in frequencies.iter().zip(&magnitudes) {
        println!("{:.2},{:.4}", frequency, magnitude);
    }

    Ok(())
}

/// List every parameter with its range, default and current value.
pub fn list_params(params: &ParamArgs) -> Result<()> {
    let settings = params.settings().context("Failed to resolve parameters")?;
    let store = ParameterStore::with_settings(&settings);

    println!("{:<14} {:<24} {:<12} {}", "Parameter", "Range", "Default", "Value");
    for id in ParamId::ALL {
        let spec = id.spec();
        let range = match spec.kind {
            ParamKind::Choice { choices } => choices.join(" | "),
            ParamKind::Float { .. } => format!(
                "{} .. {} (step {})",
                spec.range.min, spec.range.max, spec.range.interval
            ),
        };
        println!(
            "{:<14} {:<24} {:<12} {}",
            id.name(),
            range,
            spec.display_string(spec.default),
            store.display_string(id)
        );
    }

    Ok(())
}
