//! State persistence
//!
//! The only persisted state is the set of parameter values. The blob is
//! JSON with a format version, a save timestamp and a SHA-256 checksum
//! over the parameter map, which is verified on load.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EqError, Result};
use crate::params::{ChainSettings, ParamId, ParameterStore};

/// Current state format version
pub const STATE_VERSION: u32 = 1;

/// Serialized parameter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqState {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Raw values keyed by host-visible parameter name
    pub parameters: BTreeMap<String, f32>,
    /// Hex SHA-256 of the canonical parameter encoding
    pub checksum: String,
}

impl EqState {
    /// Capture the current values of `store`
    pub fn capture(store: &ParameterStore) -> Self {
        Self::from_parameters(store.values_by_name())
    }

    /// Build a state from a settings snapshot
    pub fn from_settings(settings: &ChainSettings) -> Self {
        let raw = settings.to_raw();
        let parameters = ParamId::ALL
            .into_iter()
            .map(|id| (id.name().to_string(), raw[id.index()]))
            .collect();
        Self::from_parameters(parameters)
    }

    fn from_parameters(parameters: BTreeMap<String, f32>) -> Self {
        let checksum = Self::checksum(&parameters);
        Self {
            version: STATE_VERSION,
            saved_at: Utc::now(),
            parameters,
            checksum,
        }
    }

    fn checksum(parameters: &BTreeMap<String, f32>) -> String {
        // BTreeMap keeps the encoding independent of insertion order
        let encoded = serde_json::to_vec(parameters).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&encoded);
        format!("{:x}", hasher.finalize())
    }

    /// Encode as pretty-printed JSON
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode and verify a blob
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let state: Self = serde_json::from_slice(bytes)?;
        state.verify()?;
        Ok(state)
    }

    /// Check the format version and checksum
    pub fn verify(&self) -> Result<()> {
        if self.version > STATE_VERSION {
            return Err(EqError::UnsupportedStateVersion {
                found: self.version,
                supported: STATE_VERSION,
            });
        }
        let found = Self::checksum(&self.parameters);
        if found != self.checksum {
            return Err(EqError::StateIntegrity {
                expected: self.checksum.clone(),
                found,
            });
        }
        Ok(())
    }

    /// Settings described by this state
    ///
    /// Parameters missing from the blob take their defaults; unknown names
    /// are ignored with a warning. Values are clamped into range.
    pub fn settings(&self) -> ChainSettings {
        let mut raw = ChainSettings::default().to_raw();
        for (name, &value) in &self.parameters {
            match ParamId::from_name(name) {
                Ok(id) => raw[id.index()] = value,
                Err(_) => warn!("Ignoring unknown parameter '{}' in saved state", name),
            }
        }
        ChainSettings::from_raw(&raw).clamped()
    }

    /// Replace every value in `store` in one step
    pub fn apply_to(&self, store: &ParameterStore) {
        store.apply(&self.settings());
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        info!("Saved EQ state to {:?}", path);
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let state = Self::from_bytes(&bytes)?;
        info!("Loaded EQ state from {:?} (saved {})", path, state.saved_at);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Slope;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn custom_settings() -> ChainSettings {
        ChainSettings {
            low_cut_freq: 80.0,
            high_cut_freq: 9000.0,
            peak_freq: 1200.0,
            peak_gain_db: -4.5,
            peak_quality: 2.5,
            low_cut_slope: Slope::Db36,
            high_cut_slope: Slope::Db24,
        }
    }

    #[test]
    fn test_capture_and_restore() {
        let store = ParameterStore::with_settings(&custom_settings());
        let bytes = EqState::capture(&store).to_bytes().unwrap();

        let restored = ParameterStore::new();
        restored.take_changed();
        EqState::from_bytes(&bytes).unwrap().apply_to(&restored);

        assert_eq!(restored.snapshot(), custom_settings());
        assert!(restored.take_changed());
    }

    #[test]
    fn test_tampered_blob_rejected() {
        let state = EqState::from_settings(&custom_settings());
        let mut tampered = state.clone();
        tampered.parameters.insert("Peak Gain".to_string(), 24.0);
        let bytes = serde_json::to_vec(&tampered).unwrap();

        let err = EqState::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.error_code(), "STATE_INTEGRITY");
    }

    #[test]
    fn test_future_version_rejected() {
        let mut state = EqState::from_settings(&custom_settings());
        state.version = STATE_VERSION + 1;
        let bytes = serde_json::to_vec(&state).unwrap();

        assert!(matches!(
            EqState::from_bytes(&bytes),
            Err(EqError::UnsupportedStateVersion { .. })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            EqState::from_bytes(b"not json"),
            Err(EqError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_and_unknown_parameters() {
        let mut parameters = BTreeMap::new();
        parameters.insert("Peak Gain".to_string(), 6.0);
        parameters.insert("Output Trim".to_string(), -3.0);
        let state = EqState::from_parameters(parameters);

        let settings = state.settings();
        assert_eq!(settings.peak_gain_db, 6.0);
        assert_eq!(settings.peak_freq, ChainSettings::default().peak_freq);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut parameters = BTreeMap::new();
        parameters.insert("Peak Gain".to_string(), 80.0);
        parameters.insert("LowCut Freq".to_string(), 1.0);
        let settings = EqState::from_parameters(parameters).settings();

        assert_eq!(settings.peak_gain_db, 24.0);
        assert_eq!(settings.low_cut_freq, 20.0);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eq_state.json");

        let state = EqState::from_settings(&custom_settings());
        state.save_to_file(&path).unwrap();
        let loaded = EqState::load_from_file(&path).unwrap();

        assert_eq!(loaded.parameters, state.parameters);
        assert_eq!(loaded.settings(), custom_settings());
    }
}
