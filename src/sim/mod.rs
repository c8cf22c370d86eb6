//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Time comes in as a parameter, never read from a clock
//! - No rendering, storage or platform dependencies

pub mod collision;
pub mod physics;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{circles_overlap, point_in_polygon};
pub use physics::{PhysicsParams, clamp_speed, integrate};
pub use spawn::{laser_count, laser_speed_multiplier, oil_spill_count, run_spawners};
pub use state::{
    Arena, Ball, Collectible, CollectibleKind, Effect, GameEvent, GamePhase, GameState, Hud, Laser,
    LaserPattern, Obstacle, OilSpill, PowerUpKind, PowerUps, SpawnTimers,
};
pub use tick::{TickInput, autopilot_axes, tick};
