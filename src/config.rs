//! Engine configuration
//!
//! Loaded from a JSON file or built from defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::dsp::{validate_sample_rate, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use crate::error::{EqError, Result};

/// Default sample rate
pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

/// Default host block size
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 512;

/// Default publisher / response refresh rate in Hz
pub const DEFAULT_REFRESH_RATE_HZ: f64 = 60.0;

/// Runtime settings of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate the render side is prepared for
    pub sample_rate: f64,
    /// Largest block the host will pass to a single process call
    pub max_block_size: usize,
    /// How often the publisher polls for parameter changes
    pub refresh_rate_hz: f64,
    /// Number of points on the response curve
    pub response_points: usize,
    /// Capacity of each channel's coefficient hand-off queue
    pub queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
            response_points: 512,
            queue_capacity: 16,
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        info!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if validate_sample_rate(self.sample_rate).is_err() {
            return Err(EqError::InvalidConfig {
                reason: format!(
                    "sample_rate {} outside {}..={}",
                    self.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
                ),
            });
        }
        if self.max_block_size == 0 {
            return Err(EqError::InvalidConfig {
                reason: "max_block_size must be at least 1".to_string(),
            });
        }
        if !self.refresh_rate_hz.is_finite() || self.refresh_rate_hz <= 0.0 || self.refresh_rate_hz > 1000.0 {
            return Err(EqError::InvalidConfig {
                reason: format!("refresh_rate_hz {} outside (0, 1000]", self.refresh_rate_hz),
            });
        }
        if self.response_points < 2 {
            return Err(EqError::InvalidConfig {
                reason: "response_points must be at least 2".to_string(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(EqError::InvalidConfig {
                reason: "queue_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Period of the publisher tick
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 48000.0);
        assert_eq!(config.max_block_size, 512);
    }

    #[test]
    fn test_refresh_interval() {
        let config = EngineConfig {
            refresh_rate_hz: 50.0,
            ..Default::default()
        };
        assert_eq!(config.refresh_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        let config = EngineConfig {
            sample_rate: 96000.0,
            max_block_size: 1024,
            ..Default::default()
        };

        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "sample_rate": 44100.0 }"#).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.sample_rate, 44100.0);
        assert_eq!(loaded.queue_capacity, 16);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_rate = EngineConfig {
            sample_rate: 100.0,
            ..Default::default()
        };
        assert!(matches!(bad_rate.validate(), Err(EqError::InvalidConfig { .. })));

        let bad_block = EngineConfig {
            max_block_size: 0,
            ..Default::default()
        };
        assert!(bad_block.validate().is_err());

        let bad_refresh = EngineConfig {
            refresh_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(bad_refresh.validate().is_err());
    }
}
