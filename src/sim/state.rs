//! Game state and core simulation types
//!
//! Everything the per-tick update reads or writes lives in [`GameState`];
//! subsystems receive it explicitly and nothing is global.

use std::collections::VecDeque;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::tuning::Tuning;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Start menu, nothing simulated
    Menu,
    /// Grace period: physics and spawning run, health does not drain
    Starting,
    /// Active gameplay, health drains every tick
    Playing,
    /// Run ended, score recorded
    GameOver,
}

impl GamePhase {
    /// Whether ticks in this phase advance the simulation
    pub fn is_simulating(self) -> bool {
        matches!(self, GamePhase::Starting | GamePhase::Playing)
    }

    /// Allowed edges: menu → starting → playing → game over → (starting | menu)
    pub fn can_transition_to(self, next: GamePhase) -> bool {
        use GamePhase::*;
        matches!(
            (self, next),
            (Menu, Starting)
                | (Starting, Playing)
                | (Starting, GameOver)
                | (Playing, GameOver)
                | (GameOver, Starting)
                | (GameOver, Menu)
        )
    }
}

/// Viewport-derived dimensions and scale factors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
    /// `min(600, width)`
    pub base_size: f32,
    /// `base_size / 600`
    pub scale: f32,
    /// Ball radius with no power-up active
    pub base_radius: f32,
    pub magnet_radius: f32,
    /// y coordinate of the ground line
    pub ground_y: f32,
}

impl Arena {
    pub fn new(width: f32, height: f32, tuning: &Tuning) -> Result<Self> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(GameError::InvalidViewport { width, height });
        }
        let base_size = crate::base_size(width);
        let ball = &tuning.ball;
        Ok(Self {
            width,
            height,
            base_size,
            scale: base_size / crate::consts::REFERENCE_SIZE,
            base_radius: crate::scaled(base_size, ball.radius_factor, ball.radius_min, ball.radius_max),
            magnet_radius: crate::scaled(
                base_size,
                ball.magnet_radius_factor,
                ball.magnet_radius_min,
                ball.magnet_radius_max,
            ),
            ground_y: height - tuning.physics.ground_margin,
        })
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// The player-controlled hamster ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Current radius; always `base_radius` times the rush multiplier
    pub radius: f32,
    /// Bottom bound (ball rests with its edge on this line)
    pub ground_y: f32,
    /// Right bound
    pub max_x: f32,
}

impl Ball {
    pub fn new(arena: &Arena) -> Self {
        Self {
            pos: arena.center(),
            vel: Vec2::ZERO,
            radius: arena.base_radius,
            ground_y: arena.ground_y,
            max_x: arena.width,
        }
    }

    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

/// What a falling pickup does when collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectibleKind {
    /// Coffee bean: +health, +score
    Regular,
    /// Coffee cup: full health and the rush power-up
    Coffee,
    /// Magnet: pulls nearby beans toward the ball
    Magnet,
}

impl CollectibleKind {
    pub fn is_power_up(self) -> bool {
        !matches!(self, CollectibleKind::Regular)
    }
}

/// A falling pickup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub id: u32,
    pub kind: CollectibleKind,
    pub pos: Vec2,
    pub radius: f32,
    /// Fall speed per tick
    pub speed: f32,
}

/// Inert falling hazard: drawn, never collided with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub pos: Vec2,
    pub radius: f32,
    pub speed: f32,
}

/// A laser head sweeping from one screen edge to the opposite one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Laser {
    pub id: u32,
    pub start: Vec2,
    pub end: Vec2,
    /// Current head position
    pub head: Vec2,
    /// Per-tick displacement (direction scaled by speed)
    pub step: Vec2,
    pub speed: f32,
    pub width: f32,
    pub active: bool,
    /// Previous head positions, oldest first
    pub trail: VecDeque<Vec2>,
}

impl Laser {
    pub fn new(id: u32, start: Vec2, end: Vec2, speed: f32, width: f32) -> Self {
        Self {
            id,
            start,
            end,
            head: start,
            step: (end - start).normalize_or_zero() * speed,
            speed,
            width,
            active: true,
            trail: VecDeque::new(),
        }
    }

    /// Move the head one (scaled) step, remembering where it was.
    /// Deactivates once the endpoint is closer than one step.
    pub fn advance(&mut self, k: f32, trail_len: usize) {
        if !self.active {
            return;
        }
        self.trail.push_back(self.head);
        if self.trail.len() > trail_len {
            self.trail.pop_front();
        }
        self.head += self.step * k;
        if self.head.distance(self.end) < self.speed {
            self.active = false;
        }
    }
}

/// A slick that halves the ball's top speed while it is inside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OilSpill {
    pub id: u32,
    pub pos: Vec2,
    /// Bounding radius before jitter
    pub radius: f32,
    /// Outline relative to `pos`
    pub points: Vec<Vec2>,
    pub speed: f32,
}

impl OilSpill {
    /// Outline in world space
    pub fn world_points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.points.iter().map(move |p| *p + self.pos)
    }
}

/// Timed effect kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    Rush,
    Magnet,
}

/// One timed effect: active flag plus expiry timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub active: bool,
    pub expires_at: u64,
}

impl Effect {
    /// Start (or restart) the effect
    pub fn activate(&mut self, now: u64, duration_ms: u64) {
        self.active = true;
        self.expires_at = now + duration_ms;
    }

    /// Deactivate if past expiry. Returns true only on the tick it ends.
    pub fn expire(&mut self, now: u64) -> bool {
        if self.active && now > self.expires_at {
            self.active = false;
            return true;
        }
        false
    }

    pub fn remaining_ms(&self, now: u64) -> u64 {
        if self.active {
            self.expires_at.saturating_sub(now)
        } else {
            0
        }
    }
}

/// Active power-up effects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUps {
    pub rush: Effect,
    pub magnet: Effect,
}

/// Last firing time of each interval-gated generator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnTimers {
    pub collectible: u64,
    pub obstacle: u64,
    pub coffee: u64,
    pub magnet: u64,
    /// When the last laser pattern ended
    pub laser: u64,
    pub oil: u64,
}

impl SpawnTimers {
    pub fn all_at(now: u64) -> Self {
        Self {
            collectible: now,
            obstacle: now,
            coffee: now,
            magnet: now,
            laser: now,
            oil: now,
        }
    }
}

/// Laser burst state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaserPattern {
    pub active: bool,
    pub started_at: u64,
}

/// Things that happened during a tick, for audio/HUD consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged { from: GamePhase, to: GamePhase },
    Collected { kind: CollectibleKind, points: u64 },
    PowerUpStarted(PowerUpKind),
    PowerUpEnded(PowerUpKind),
    LaserPatternStarted { count: usize },
    LaserPatternEnded,
    LaserHit { damage: f32 },
    EnteredOil,
    GameOver { score: u64 },
}

/// Values the HUD shows, refreshed every tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub score: u64,
    /// 0-100
    pub health_percent: f32,
    pub rush_remaining_ms: u64,
    pub magnet_remaining_ms: u64,
    pub phase: GamePhase,
}

/// Complete simulation context
#[derive(Debug, Clone)]
pub struct GameState {
    /// Seed the RNG was created from
    pub seed: u64,
    pub rng: Pcg32,
    pub phase: GamePhase,
    /// Timestamp of the last phase change
    pub phase_started_at: u64,
    pub arena: Arena,
    pub ball: Ball,
    pub score: u64,
    health: f32,
    max_health: f32,
    pub collectibles: Vec<Collectible>,
    pub obstacles: Vec<Obstacle>,
    pub lasers: Vec<Laser>,
    pub laser_pattern: LaserPattern,
    pub oil_spills: Vec<OilSpill>,
    /// Whether the ball was inside a spill this tick
    pub in_oil: bool,
    pub power_ups: PowerUps,
    pub spawn: SpawnTimers,
    /// Simulation tick counter for the current run
    pub time_ticks: u64,
    pub hud: Hud,
    /// Events since the last drain
    pub events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Create a state sitting in the menu
    pub fn new(seed: u64, arena: Arena, tuning: &Tuning) -> Self {
        let max_health = tuning.health.max;
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Menu,
            phase_started_at: 0,
            arena,
            ball: Ball::new(&arena),
            score: 0,
            health: max_health,
            max_health,
            collectibles: Vec::new(),
            obstacles: Vec::new(),
            lasers: Vec::new(),
            laser_pattern: LaserPattern::default(),
            oil_spills: Vec::new(),
            in_oil: false,
            power_ups: PowerUps::default(),
            spawn: SpawnTimers::default(),
            time_ticks: 0,
            hud: Hud {
                score: 0,
                health_percent: 100.0,
                rush_remaining_ms: 0,
                magnet_remaining_ms: 0,
                phase: GamePhase::Menu,
            },
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // --- Health ("coffee level"), always within [0, max] ---

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn set_health(&mut self, value: f32) {
        self.health = value.clamp(0.0, self.max_health);
    }

    pub fn heal(&mut self, amount: f32) {
        self.set_health(self.health + amount);
    }

    pub fn damage(&mut self, amount: f32) {
        self.set_health(self.health - amount);
    }

    // --- Derived ball limits ---

    /// Radius/max-speed multiplier from the rush power-up
    pub fn size_multiplier(&self, tuning: &Tuning) -> f32 {
        if self.power_ups.rush.active {
            tuning.power_ups.rush_multiplier
        } else {
            1.0
        }
    }

    /// Re-derive the ball radius from the base radius and active power-up
    pub fn sync_ball_radius(&mut self, tuning: &Tuning) {
        self.ball.radius = self.arena.base_radius * self.size_multiplier(tuning);
    }

    /// Speed cap for this tick. Rush wins over oil; oil only slows an
    /// un-boosted ball.
    pub fn max_speed(&self, tuning: &Tuning) -> f32 {
        let base = tuning.physics.base_max_speed * self.arena.scale;
        if self.power_ups.rush.active {
            base * tuning.power_ups.rush_multiplier
        } else if self.in_oil {
            base * tuning.oil.slowdown
        } else {
            base
        }
    }

    // --- Phase machine ---

    /// Move to another phase if the edge is allowed
    pub fn transition(&mut self, to: GamePhase, now: u64) -> Result<()> {
        let from = self.phase;
        if !from.can_transition_to(to) {
            return Err(GameError::InvalidTransition { from, to });
        }
        self.phase = to;
        self.phase_started_at = now;
        self.hud.phase = to;
        self.events.push(GameEvent::PhaseChanged { from, to });
        log::info!("Phase {:?} -> {:?}", from, to);
        Ok(())
    }

    /// Start (or restart) a run: enter the grace period with a clean slate
    pub fn begin_run(&mut self, tuning: &Tuning, now: u64) -> Result<()> {
        self.transition(GamePhase::Starting, now)?;
        self.reset_run(tuning, now);
        Ok(())
    }

    /// Leave the game-over screen for the start menu
    pub fn return_to_menu(&mut self, now: u64) -> Result<()> {
        self.transition(GamePhase::Menu, now)
    }

    /// Entry action for a run: clear entities, timers and effects; center the ball
    fn reset_run(&mut self, tuning: &Tuning, now: u64) {
        self.score = 0;
        self.max_health = tuning.health.max;
        self.health = self.max_health;
        self.collectibles.clear();
        self.obstacles.clear();
        self.lasers.clear();
        self.laser_pattern = LaserPattern::default();
        self.oil_spills.clear();
        self.in_oil = false;
        self.power_ups = PowerUps::default();
        self.spawn = SpawnTimers::all_at(now);
        self.time_ticks = 0;
        self.ball = Ball::new(&self.arena);
        self.sync_ball_radius(tuning);
        self.refresh_hud(now);
    }

    /// Apply a new viewport. The ball keeps its place but is kept in bounds.
    pub fn resize(&mut self, arena: Arena, tuning: &Tuning) {
        self.arena = arena;
        self.ball.ground_y = arena.ground_y;
        self.ball.max_x = arena.width;
        self.sync_ball_radius(tuning);
        if !self.phase.is_simulating() {
            self.ball.pos = arena.center();
            self.ball.vel = Vec2::ZERO;
        }
    }

    pub fn refresh_hud(&mut self, now: u64) {
        self.hud = Hud {
            score: self.score,
            health_percent: self.health / self.max_health * 100.0,
            rush_remaining_ms: self.power_ups.rush.remaining_ms(now),
            magnet_remaining_ms: self.power_ups.magnet.remaining_ms(now),
            phase: self.phase,
        };
    }

    /// Hand accumulated events to the caller
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
