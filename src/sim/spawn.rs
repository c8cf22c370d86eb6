//! Interval-gated entity generators
//!
//! Each generator compares `now - last` against its interval and fires at
//! most once per tick. Hazards get denser and faster as the score climbs.

use glam::Vec2;
use rand::Rng;

use super::state::{
    Collectible, CollectibleKind, GameEvent, GameState, Laser, Obstacle, OilSpill,
};
use crate::tuning::{FallerTuning, LaserTuning, OilTuning, Tuning};

/// Run every generator and advance hazards for one tick
pub fn run_spawners(state: &mut GameState, tuning: &Tuning, now: u64, k: f32) {
    spawn_collectibles(state, tuning, now);
    spawn_obstacles(state, tuning, now);
    spawn_power_ups(state, tuning, now);
    update_laser_pattern(state, tuning, now, k);
    spawn_oil_spills(state, tuning, now);
    advance_hazards(state, k);
}

fn elapsed(now: u64, last: u64, interval: u64) -> bool {
    now.saturating_sub(last) > interval
}

/// `floor(base × growth^floor((score − gate) / step))`, 0 below the gate,
/// never above `max`
fn scaled_count(score: u64, gate: u64, step: u64, base: f32, growth: f32, max: usize) -> usize {
    if score < gate {
        return 0;
    }
    let steps = ((score - gate) / step).min(i32::MAX as u64) as i32;
    let count = (base * growth.powi(steps)).floor();
    // Saturating cast: infinity becomes usize::MAX
    (count as usize).min(max)
}

/// Lasers in a pattern started at this score
pub fn laser_count(score: u64, laser: &LaserTuning) -> usize {
    scaled_count(
        score,
        laser.score_gate,
        laser.count_step,
        laser.base_count,
        laser.count_growth,
        laser.max_count,
    )
}

/// `1 + bonus × floor((score − gate) / speed_step)`
pub fn laser_speed_multiplier(score: u64, laser: &LaserTuning) -> f32 {
    let beyond = score.saturating_sub(laser.score_gate);
    1.0 + (beyond / laser.speed_step) as f32 * laser.speed_bonus
}

/// Oil spills dropped per batch at this score
pub fn oil_spill_count(score: u64, oil: &OilTuning) -> usize {
    scaled_count(
        score,
        oil.score_gate,
        oil.count_step,
        oil.base_count,
        oil.count_growth,
        oil.max_count,
    )
}

/// A falling entity placed at a random x just above the top edge
fn drop_point(state: &mut GameState, size: f32) -> Vec2 {
    let span = (state.arena.width - size).max(0.0);
    let x = state.rng.random::<f32>() * span;
    Vec2::new(x, -size)
}

fn make_collectible(
    state: &mut GameState,
    kind: CollectibleKind,
    faller: &FallerTuning,
) -> Collectible {
    let base = state.arena.base_size;
    let size = faller.size(base);
    Collectible {
        id: state.next_entity_id(),
        kind,
        pos: drop_point(state, size),
        radius: size / 2.0,
        speed: faller.speed(base),
    }
}

/// One regular coffee bean every interval
pub fn spawn_collectibles(state: &mut GameState, tuning: &Tuning, now: u64) {
    if !elapsed(now, state.spawn.collectible, tuning.spawn.collectible_interval_ms) {
        return;
    }
    let bean = make_collectible(state, CollectibleKind::Regular, &tuning.spawn.collectible);
    state.collectibles.push(bean);
    state.spawn.collectible = now;
}

/// Inert obstacles: they fall and leave, nothing collides with them
pub fn spawn_obstacles(state: &mut GameState, tuning: &Tuning, now: u64) {
    if !elapsed(now, state.spawn.obstacle, tuning.spawn.obstacle_interval_ms) {
        return;
    }
    let base = state.arena.base_size;
    let size = tuning.spawn.obstacle.size(base);
    let obstacle = Obstacle {
        id: state.next_entity_id(),
        pos: drop_point(state, size),
        radius: size / 2.0,
        speed: tuning.spawn.obstacle.speed(base),
    };
    state.obstacles.push(obstacle);
    state.spawn.obstacle = now;
}

/// Coffee and magnet power-ups, each on its own timer
pub fn spawn_power_ups(state: &mut GameState, tuning: &Tuning, now: u64) {
    let interval = tuning.spawn.power_up_interval_ms;

    if elapsed(now, state.spawn.coffee, interval) {
        let cup = make_collectible(state, CollectibleKind::Coffee, &tuning.spawn.power_up);
        state.collectibles.push(cup);
        state.spawn.coffee = now;
    }

    if elapsed(now, state.spawn.magnet, interval) {
        let magnet = make_collectible(state, CollectibleKind::Magnet, &tuning.spawn.power_up);
        state.collectibles.push(magnet);
        state.spawn.magnet = now;
    }
}

/// Start, advance and end laser bursts
pub fn update_laser_pattern(state: &mut GameState, tuning: &Tuning, now: u64, k: f32) {
    let laser = &tuning.laser;
    if state.score < laser.score_gate {
        return;
    }

    if !state.laser_pattern.active && elapsed(now, state.spawn.laser, laser.cooldown_ms) {
        state.laser_pattern.active = true;
        state.laser_pattern.started_at = now;
        state.lasers.clear();

        let count = laser_count(state.score, laser);
        let speed = laser.base_speed * laser_speed_multiplier(state.score, laser) * state.arena.scale;
        for _ in 0..count {
            let beam = random_laser(state, speed, laser.width);
            state.lasers.push(beam);
        }
        state.events.push(GameEvent::LaserPatternStarted { count });
        log::debug!("Laser pattern: {} beams at speed {:.2}", count, speed);
    }

    for beam in state.lasers.iter_mut() {
        beam.advance(k, laser.trail_len);
    }

    if state.laser_pattern.active && now.saturating_sub(state.laser_pattern.started_at) > laser.pattern_ms {
        state.laser_pattern.active = false;
        state.spawn.laser = now;
        state.lasers.clear();
        state.events.push(GameEvent::LaserPatternEnded);
    }
}

/// A beam from a random edge straight across to the opposite edge
fn random_laser(state: &mut GameState, speed: f32, width: f32) -> Laser {
    let (w, h) = (state.arena.width, state.arena.height);
    let edge = state.rng.random_range(0..4u8);
    let t: f32 = state.rng.random();
    let (start, end) = match edge {
        // Top
        0 => (Vec2::new(t * w, 0.0), Vec2::new(t * w, h)),
        // Right
        1 => (Vec2::new(w, t * h), Vec2::new(0.0, t * h)),
        // Bottom
        2 => (Vec2::new(t * w, h), Vec2::new(t * w, 0.0)),
        // Left
        _ => (Vec2::new(0.0, t * h), Vec2::new(w, t * h)),
    };
    let id = state.next_entity_id();
    Laser::new(id, start, end, speed, width)
}

/// Batches of star-shaped spills once the score passes the gate
pub fn spawn_oil_spills(state: &mut GameState, tuning: &Tuning, now: u64) {
    let oil = &tuning.oil;
    if state.score < oil.score_gate || !elapsed(now, state.spawn.oil, oil.interval_ms) {
        return;
    }

    let count = oil_spill_count(state.score, oil);
    for _ in 0..count {
        let spill = random_oil_spill(state, oil);
        state.oil_spills.push(spill);
    }
    state.spawn.oil = now;
    log::debug!("Dropped {} oil spills", count);
}

fn random_oil_spill(state: &mut GameState, oil: &OilTuning) -> OilSpill {
    let radius = state.ball.radius * oil.radius_factor;
    let n = oil.vertices;
    let points = (0..n)
        .map(|i| {
            let angle = i as f32 / n as f32 * std::f32::consts::TAU;
            let jitter = state.rng.random::<f32>() * oil.jitter * 2.0 - oil.jitter;
            Vec2::new(angle.cos(), angle.sin()) * radius * (1.0 + jitter)
        })
        .collect();
    let span = (state.arena.width - radius * 2.0).max(0.0);
    let x = state.rng.random::<f32>() * span + radius;
    OilSpill {
        id: state.next_entity_id(),
        pos: Vec2::new(x, -radius),
        radius,
        points,
        speed: oil.speed * state.arena.scale,
    }
}

/// Drift obstacles and spills downward; drop the ones past the bottom edge
pub fn advance_hazards(state: &mut GameState, k: f32) {
    let height = state.arena.height;

    for obstacle in state.obstacles.iter_mut() {
        obstacle.pos.y += obstacle.speed * k;
    }
    state.obstacles.retain(|o| o.pos.y - o.radius <= height);

    for spill in state.oil_spills.iter_mut() {
        spill.pos.y += spill.speed * k;
    }
    state.oil_spills.retain(|o| o.pos.y - o.radius <= height);
}
