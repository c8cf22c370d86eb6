//! Data-driven game balance
//!
//! Every gameplay constant lives here so a run can be re-balanced from JSON
//! without touching the simulation. Per-tick amounts are expressed per
//! `SIM_DT` step; times are milliseconds. Values marked "scaled" are
//! multiplied by `base_size / 600` when the arena is sized.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Ball motion constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Downward acceleration per tick (scaled)
    pub gravity: f32,
    /// Velocity multiplier applied every tick, in (0, 1)
    pub friction: f32,
    /// Fraction of velocity kept after bouncing off a bound, in (0, 1)
    pub bounce: f32,
    /// Speed cap with no power-up (scaled)
    pub base_max_speed: f32,
    /// Force to velocity multiplier (scaled)
    pub force_multiplier: f32,
    /// Input axis gain applied before the force multiplier
    pub input_gain: f32,
    /// Distance between the viewport bottom and the ground line
    pub ground_margin: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: 0.2,
            friction: 0.98,
            bounce: 0.5,
            base_max_speed: 5.0,
            force_multiplier: 3.0,
            input_gain: 2.0,
            ground_margin: 50.0,
        }
    }
}

/// Ball and magnet sizing (fractions of base size, clamped)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallTuning {
    pub radius_factor: f32,
    pub radius_min: f32,
    pub radius_max: f32,
    pub magnet_radius_factor: f32,
    pub magnet_radius_min: f32,
    pub magnet_radius_max: f32,
    /// Per-tick pull speed of collectibles inside the magnet radius
    pub magnet_pull_speed: f32,
    /// Vertical pull is damped by this factor...
    pub magnet_vertical_damping: f32,
    /// ...and biased downward by this amount per tick
    pub magnet_vertical_bias: f32,
}

impl Default for BallTuning {
    fn default() -> Self {
        Self {
            radius_factor: 0.045,
            radius_min: 30.0,
            radius_max: 45.0,
            magnet_radius_factor: 0.3,
            magnet_radius_min: 150.0,
            magnet_radius_max: 225.0,
            magnet_pull_speed: 4.0,
            magnet_vertical_damping: 0.5,
            magnet_vertical_bias: 1.0,
        }
    }
}

/// Health ("coffee level") and scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthTuning {
    pub max: f32,
    /// Drain per tick while playing
    pub drain: f32,
    /// Drain per tick while the rush power-up is active
    pub drain_rush: f32,
    pub regular_heal: f32,
    pub regular_points: u64,
    pub power_up_points: u64,
    /// Grace period after a run starts during which health does not drain
    pub grace_ms: u64,
}

impl Default for HealthTuning {
    fn default() -> Self {
        Self {
            max: 100.0,
            drain: 0.225,
            drain_rush: 0.22,
            regular_heal: 10.0,
            regular_points: 10,
            power_up_points: 20,
            grace_ms: 3000,
        }
    }
}

/// Size and fall speed of one kind of falling entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallerTuning {
    pub size_factor: f32,
    pub size_min: f32,
    pub size_max: f32,
    pub speed_factor: f32,
    pub speed_min: f32,
    pub speed_max: f32,
}

impl FallerTuning {
    /// Diameter for the given base size
    pub fn size(&self, base: f32) -> f32 {
        crate::scaled(base, self.size_factor, self.size_min, self.size_max)
    }

    /// Fall speed per tick for the given base size
    pub fn speed(&self, base: f32) -> f32 {
        crate::scaled(base, self.speed_factor, self.speed_min, self.speed_max)
    }
}

/// Interval-gated generators for falling entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    pub collectible_interval_ms: u64,
    pub obstacle_interval_ms: u64,
    pub power_up_interval_ms: u64,
    pub collectible: FallerTuning,
    pub power_up: FallerTuning,
    pub obstacle: FallerTuning,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            collectible_interval_ms: 600,
            obstacle_interval_ms: 5000,
            power_up_interval_ms: 6900,
            collectible: FallerTuning {
                size_factor: 0.04,
                size_min: 50.0,
                size_max: 70.0,
                speed_factor: 0.003,
                speed_min: 2.0,
                speed_max: 4.0,
            },
            power_up: FallerTuning {
                size_factor: 0.05,
                size_min: 60.0,
                size_max: 80.0,
                speed_factor: 0.002,
                speed_min: 2.0,
                speed_max: 3.0,
            },
            obstacle: FallerTuning {
                size_factor: 0.03,
                size_min: 35.0,
                size_max: 45.0,
                speed_factor: 0.004,
                speed_min: 3.0,
                speed_max: 5.0,
            },
        }
    }
}

/// Laser pattern hazard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaserTuning {
    /// Score at which patterns start appearing
    pub score_gate: u64,
    /// Cooldown between the end of one pattern and the start of the next
    pub cooldown_ms: u64,
    pub pattern_ms: u64,
    pub base_count: f32,
    /// Count multiplier per `count_step` points beyond the gate
    pub count_growth: f32,
    pub count_step: u64,
    /// Upper bound on lasers per pattern
    pub max_count: usize,
    /// Per-tick head speed (scaled)
    pub base_speed: f32,
    /// Speed bonus per `speed_step` points beyond the gate
    pub speed_bonus: f32,
    pub speed_step: u64,
    pub width: f32,
    pub damage: f32,
    pub trail_len: usize,
}

impl Default for LaserTuning {
    fn default() -> Self {
        Self {
            score_gate: 500,
            cooldown_ms: 3000,
            pattern_ms: 2000,
            base_count: 2.0,
            count_growth: 1.35,
            count_step: 500,
            max_count: 12,
            base_speed: 10.5,
            speed_bonus: 0.05,
            speed_step: 250,
            width: 8.0,
            damage: 30.0,
            trail_len: 3,
        }
    }
}

/// Oil spill hazard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OilTuning {
    pub score_gate: u64,
    pub interval_ms: u64,
    pub base_count: f32,
    pub count_growth: f32,
    pub count_step: u64,
    /// Upper bound on spills per batch
    pub max_count: usize,
    /// Spill radius as a multiple of the current ball radius
    pub radius_factor: f32,
    pub vertices: usize,
    /// Radial jitter of each vertex, as a fraction of the radius
    pub jitter: f32,
    /// Per-tick fall speed (scaled)
    pub speed: f32,
    /// Max-speed multiplier while the ball is inside a spill
    pub slowdown: f32,
}

impl Default for OilTuning {
    fn default() -> Self {
        Self {
            score_gate: 1000,
            interval_ms: 8000,
            base_count: 1.0,
            count_growth: 1.35,
            count_step: 500,
            max_count: 6,
            radius_factor: 3.0,
            vertices: 8,
            jitter: 0.3,
            speed: 2.0,
            slowdown: 0.5,
        }
    }
}

/// Timed power-up effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpTuning {
    /// Max speed and radius multiplier while rush is active
    pub rush_multiplier: f32,
    pub rush_ms: u64,
    pub magnet_ms: u64,
}

impl Default for PowerUpTuning {
    fn default() -> Self {
        Self {
            rush_multiplier: 1.25,
            rush_ms: 7000,
            magnet_ms: 10_000,
        }
    }
}

/// High score retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LeaderboardTuning {
    /// Maximum entries kept; `None` keeps every run
    pub capacity: Option<usize>,
}

/// Complete game balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Tuning {
    pub physics: PhysicsTuning,
    pub ball: BallTuning,
    pub health: HealthTuning,
    pub spawn: SpawnTuning,
    pub laser: LaserTuning,
    pub oil: OilTuning,
    pub power_ups: PowerUpTuning,
    pub leaderboard: LeaderboardTuning,
}

impl Tuning {
    /// Parse tuning from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values that would break simulation invariants
    pub fn validate(&self) -> Result<()> {
        let p = &self.physics;
        if !(p.friction > 0.0 && p.friction < 1.0) {
            return Err(invalid("physics.friction must be in (0, 1)"));
        }
        if !(p.bounce > 0.0 && p.bounce < 1.0) {
            return Err(invalid("physics.bounce must be in (0, 1)"));
        }
        if p.base_max_speed <= 0.0 {
            return Err(invalid("physics.base_max_speed must be positive"));
        }
        if self.health.max <= 0.0 {
            return Err(invalid("health.max must be positive"));
        }
        let b = &self.ball;
        let s = &self.spawn;
        let bounds = [
            ("ball.radius", b.radius_min, b.radius_max),
            ("ball.magnet_radius", b.magnet_radius_min, b.magnet_radius_max),
            ("spawn.collectible.size", s.collectible.size_min, s.collectible.size_max),
            ("spawn.collectible.speed", s.collectible.speed_min, s.collectible.speed_max),
            ("spawn.power_up.size", s.power_up.size_min, s.power_up.size_max),
            ("spawn.power_up.speed", s.power_up.speed_min, s.power_up.speed_max),
            ("spawn.obstacle.size", s.obstacle.size_min, s.obstacle.size_max),
            ("spawn.obstacle.speed", s.obstacle.speed_min, s.obstacle.speed_max),
        ];
        // Also rejects NaN, which `f32::clamp` panics on
        if let Some((name, min, max)) = bounds.iter().find(|(_, min, max)| !(min <= max)) {
            return Err(GameError::InvalidTuning(format!(
                "{name}_min ({min}) must not exceed {name}_max ({max})"
            )));
        }
        let intervals = [
            ("spawn.collectible_interval_ms", self.spawn.collectible_interval_ms),
            ("spawn.obstacle_interval_ms", self.spawn.obstacle_interval_ms),
            ("spawn.power_up_interval_ms", self.spawn.power_up_interval_ms),
            ("laser.pattern_ms", self.laser.pattern_ms),
            ("oil.interval_ms", self.oil.interval_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return Err(GameError::InvalidTuning(format!("{name} must be positive")));
        }
        if self.laser.count_step == 0 || self.laser.speed_step == 0 || self.oil.count_step == 0 {
            return Err(invalid("score steps must be positive"));
        }
        if self.oil.vertices < 3 {
            return Err(invalid("oil.vertices must be at least 3"));
        }
        if !(0.0..1.0).contains(&self.oil.jitter) {
            return Err(invalid("oil.jitter must be in [0, 1)"));
        }
        if self.oil.slowdown <= 0.0 || self.power_ups.rush_multiplier <= 0.0 {
            return Err(invalid("speed multipliers must be positive"));
        }
        if self.leaderboard.capacity == Some(0) {
            return Err(invalid("leaderboard.capacity must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> GameError {
    GameError::InvalidTuning(msg.to_string())
}
