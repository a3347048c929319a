//! CLI Module
//!
//! Command-line front end: render WAV files through the stereo EQ, print
//! the response curve, list the parameter layout.

pub mod commands;
mod wav;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::params::{ChainSettings, Slope};
use crate::state::EqState;

/// Cascade EQ - three-section parametric equalizer
#[derive(Parser, Debug)]
#[command(name = "cascade-eq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a WAV file through the equalizer
    #[command(name = "render")]
    Render {
        /// Input WAV file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        /// Frames per processing block (defaults to the configured maximum)
        #[arg(short, long)]
        block_size: Option<usize>,

        /// Save the parameters used to this state file
        #[arg(long)]
        save_state: Option<PathBuf>,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Print the magnitude response as CSV
    #[command(name = "response")]
    Response {
        /// Number of log-spaced points between 20 Hz and 20 kHz
        #[arg(short, long)]
        points: Option<usize>,

        /// Sample rate to evaluate at
        #[arg(short, long)]
        sample_rate: Option<f64>,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// List parameters with ranges, defaults and current values
    #[command(name = "params")]
    Params {
        #[command(flatten)]
        params: ParamArgs,
    },
}

/// Parameter overrides shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Start from a saved state file instead of the defaults
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Low cut frequency in Hz
    #[arg(long)]
    pub low_cut: Option<f32>,

    /// Low cut slope in dB/Oct (12, 24, 36 or 48)
    #[arg(long, value_parser = parse_slope)]
    pub low_cut_slope: Option<Slope>,

    /// High cut frequency in Hz
    #[arg(long)]
    pub high_cut: Option<f32>,

    /// High cut slope in dB/Oct (12, 24, 36 or 48)
    #[arg(long, value_parser = parse_slope)]
    pub high_cut_slope: Option<Slope>,

    /// Peak frequency in Hz
    #[arg(long)]
    pub peak_freq: Option<f32>,

    /// Peak gain in dB
    #[arg(long, allow_hyphen_values = true)]
    pub peak_gain: Option<f32>,

    /// Peak quality
    #[arg(long)]
    pub peak_q: Option<f32>,
}

impl ParamArgs {
    /// Resolve the settings: state file (or defaults) with flag overrides, clamped
    pub fn settings(&self) -> crate::Result<ChainSettings> {
        let mut settings = match &self.state {
            Some(path) => EqState::load_from_file(path)?.settings(),
            None => ChainSettings::default(),
        };

        if let Some(v) = self.low_cut {
            settings.low_cut_freq = v;
        }
        if let Some(v) = self.low_cut_slope {
            settings.low_cut_slope = v;
        }
        if let Some(v) = self.high_cut {
            settings.high_cut_freq = v;
        }
        if let Some(v) = self.high_cut_slope {
            settings.high_cut_slope = v;
        }
        if let Some(v) = self.peak_freq {
            settings.peak_freq = v;
        }
        if let Some(v) = self.peak_gain {
            settings.peak_gain_db = v;
        }
        if let Some(v) = self.peak_q {
            settings.peak_quality = v;
        }

        Ok(settings.clamped())
    }
}

fn parse_slope(s: &str) -> Result<Slope, String> {
    let db: u32 = s
        .trim()
        .trim_end_matches("dB/Oct")
        .trim()
        .parse()
        .map_err(|_| format!("invalid slope '{}'", s))?;
    Slope::ALL
        .into_iter()
        .find(|slope| slope.db_per_octave() == db)
        .ok_or_else(|| format!("slope must be 12, 24, 36 or 48 dB/Oct, got {}", db))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_slope() {
        assert_eq!(parse_slope("24").unwrap(), Slope::Db24);
        assert_eq!(parse_slope("48 dB/Oct").unwrap(), Slope::Db48);
        assert!(parse_slope("18").is_err());
        assert!(parse_slope("steep").is_err());
    }

    #[test]
    fn test_param_overrides() {
        let cli = Cli::parse_from([
            "cascade-eq",
            "response",
            "--low-cut",
            "100",
            "--low-cut-slope",
            "24",
            "--peak-gain",
            "-6",
        ]);
        let Some(Commands::Response { params, .. }) = cli.command else {
            panic!("expected response command");
        };
        let settings = params.settings().unwrap();
        assert_eq!(settings.low_cut_freq, 100.0);
        assert_eq!(settings.low_cut_slope, Slope::Db24);
        assert_eq!(settings.peak_gain_db, -6.0);
        assert_eq!(settings.high_cut_freq, 20000.0);
    }
}
