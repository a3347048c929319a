//! Error handling for the equalizer engine
//!
//! Errors never reach the render thread. Every failure on the control side
//! leaves the last known-good coefficients in effect.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EqError>;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EqError {
    // Design Errors
    #[error("Invalid sample rate: {sample_rate} Hz")]
    InvalidSampleRate { sample_rate: f64 },

    #[error("Unstable filter design for {stage}: {reason}")]
    UnstableFilter { stage: String, reason: String },

    // Parameter Errors
    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Invalid value for {param}: {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    // Engine Errors
    #[error("Engine used before prepare()")]
    NotPrepared,

    #[error("Block of {len} samples exceeds prepared maximum of {max}")]
    BlockTooLarge { len: usize, max: usize },

    #[error("Interleaved buffer of {len} samples is not a whole number of {channels}-channel frames")]
    PartialFrame { len: usize, channels: usize },

    // State Errors
    #[error("State checksum mismatch: expected {expected}, found {found}")]
    StateIntegrity { expected: String, found: String },

    #[error("Unsupported state version {found} (supported up to {supported})")]
    UnsupportedStateVersion { found: u32, supported: u32 },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Audio File Errors
    #[error("Audio file error: {0}")]
    AudioFile(#[from] hound::Error),

    #[error("Unsupported audio format: {format}")]
    UnsupportedAudioFormat { format: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EqError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EqError::InvalidSampleRate { .. } => "INVALID_SAMPLE_RATE",
            EqError::UnstableFilter { .. } => "UNSTABLE_FILTER",
            EqError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            EqError::InvalidParameter { .. } => "INVALID_PARAMETER",
            EqError::NotPrepared => "NOT_PREPARED",
            EqError::BlockTooLarge { .. } => "BLOCK_TOO_LARGE",
            EqError::PartialFrame { .. } => "PARTIAL_FRAME",
            EqError::StateIntegrity { .. } => "STATE_INTEGRITY",
            EqError::UnsupportedStateVersion { .. } => "UNSUPPORTED_STATE_VERSION",
            EqError::InvalidConfig { .. } => "INVALID_CONFIG",
            EqError::AudioFile(_) => "AUDIO_FILE_ERROR",
            EqError::UnsupportedAudioFormat { .. } => "UNSUPPORTED_AUDIO_FORMAT",
            EqError::Io(_) => "IO_ERROR",
            EqError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the engine keeps running on its previous state after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EqError::UnstableFilter { .. }
                | EqError::UnknownParameter { .. }
                | EqError::InvalidParameter { .. }
                | EqError::StateIntegrity { .. }
                | EqError::UnsupportedStateVersion { .. }
                | EqError::Serialization(_)
        )
    }
}
