//! Coffee Rush - A hamster-ball arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, spawning, collisions, game phases)
//! - `game`: Frame driver that feeds the simulation from a clock and input
//! - `renderer`: Render sink (frame snapshots, GPU instance data)
//! - `platform`: Browser/native platform abstraction (clock, input, web glue)
//! - `persistence`: Key-value storage for scores and settings
//! - `tuning`: Data-driven game balance

pub mod error;
pub mod game;
pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod reward;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{GameError, Result};
pub use game::{Game, LoopControl};
pub use highscores::{HighScores, ScoreEntry, ScoreStore};
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, the rate all per-tick tuning is expressed in)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;
    /// Longest frame delta fed into the accumulator (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Viewport width at which every scaled constant equals its tuned value
    pub const REFERENCE_SIZE: f32 = 600.0;
}

/// Resolution-normalization factor: `min(600, viewport_width)`
#[inline]
pub fn base_size(viewport_width: f32) -> f32 {
    viewport_width.min(consts::REFERENCE_SIZE)
}

/// Clamp `base * factor` into `[min, max]`
///
/// Every entity size and fall speed is derived this way so the game plays the
/// same on narrow and wide screens.
#[inline]
pub fn scaled(base: f32, factor: f32, min: f32, max: f32) -> f32 {
    (base * factor).clamp(min, max)
}
