//! Error types for Coffee Rush

use thiserror::Error;

use crate::sim::GamePhase;

/// The main error type for game setup and lifecycle operations
///
/// The per-tick simulation never returns errors: out-of-range values are
/// clamped where they are produced.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Invalid viewport: {width}x{height}")]
    InvalidViewport { width: f32, height: f32 },

    #[error("Invalid tuning: {0}")]
    InvalidTuning(String),

    #[error("Missing platform handle: {0}")]
    MissingHandle(&'static str),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition { from: GamePhase, to: GamePhase },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Coffee Rush operations
pub type Result<T> = std::result::Result<T, GameError>;
