//! WAV file I/O for the render command

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{EqError, Result};

/// Decoded interleaved audio
#[derive(Debug, Clone)]
pub struct WavAudio {
    pub spec: WavSpec,
    pub samples: Vec<f32>,
}

impl WavAudio {
    pub fn channels(&self) -> usize {
        self.spec.channels as usize
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels().max(1)
    }
}

fn unsupported(spec: &WavSpec) -> EqError {
    EqError::UnsupportedAudioFormat {
        format: format!("{}-bit {:?}", spec.bits_per_sample, spec.sample_format),
    }
}

/// Reject sample layouts this module cannot convert
fn check_format(spec: &WavSpec) -> Result<()> {
    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) | (SampleFormat::Int, 8 | 16 | 24 | 32) => Ok(()),
        _ => Err(unsupported(spec)),
    }
}

/// Read a WAV file as interleaved `f32` samples in -1..1
pub fn read_wav(path: &Path) -> Result<WavAudio> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    check_format(&spec)?;

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader.samples::<f32>().collect::<std::result::Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        // 24-bit stored as i32 in hound
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        _ => return Err(unsupported(&spec)),
    };

    Ok(WavAudio { spec, samples })
}

/// Write interleaved samples using the format described by `spec`
///
/// An unsupported format is rejected before the file is created.
pub fn write_wav(path: &Path, spec: WavSpec, samples: &[f32]) -> Result<()> {
    check_format(&spec)?;
    let mut writer = WavWriter::create(path, spec)?;

    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
        (SampleFormat::Int, 8) => {
            for &sample in samples {
                writer.write_sample((sample * 127.0).clamp(-128.0, 127.0) as i8)?;
            }
        }
        (SampleFormat::Int, 16) => {
            for &sample in samples {
                writer.write_sample((sample * 32767.0).clamp(-32768.0, 32767.0) as i16)?;
            }
        }
        (SampleFormat::Int, 24) => {
            for &sample in samples {
                writer.write_sample((sample * 8388607.0).clamp(-8388608.0, 8388607.0) as i32)?;
            }
        }
        (SampleFormat::Int, 32) => {
            for &sample in samples {
                let scaled = (sample as f64 * 2147483647.0).clamp(-2147483648.0, 2147483647.0);
                writer.write_sample(scaled as i32)?;
            }
        }
        _ => return Err(unsupported(&spec)),
    }

    writer.finalize()?;
    Ok(())
}
