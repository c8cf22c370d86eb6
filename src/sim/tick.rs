//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use glam::Vec2;

use super::collision::{expire_power_ups, resolve_collectibles, resolve_lasers, resolve_oil};
use super::physics::{PhysicsParams, apply_force, integrate};
use super::spawn::run_spawners;
use super::state::{GameEvent, GamePhase, GameState};
use crate::consts::SIM_DT;
use crate::platform::InputAxes;
use crate::tuning::Tuning;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Steering direction from keys or drag
    pub axes: InputAxes,
    /// Idle/demo mode - AI plays the game
    pub idle_mode: bool,
}

/// Advance the game state by one step of `dt` seconds ending at `now` (ms)
pub fn tick(state: &mut GameState, tuning: &Tuning, input: &TickInput, now: u64, dt: f32) {
    if !state.phase.is_simulating() {
        return;
    }
    state.time_ticks += 1;
    let k = dt / SIM_DT;

    let axes = if input.idle_mode {
        autopilot_axes(state)
    } else {
        input.axes
    };
    if !axes.is_idle() {
        let physics = &tuning.physics;
        apply_force(
            &mut state.ball,
            axes.as_vec2() * physics.input_gain * k,
            physics.force_multiplier * state.arena.scale,
        );
    }

    run_spawners(state, tuning, now, k);

    // Oil is sampled before integration so this tick's cap already reflects it
    resolve_oil(state);
    let params = PhysicsParams::new(tuning, &state.arena, state.max_speed(tuning));
    integrate(&mut state.ball, &params, dt);

    if state.phase == GamePhase::Starting
        && now.saturating_sub(state.phase_started_at) >= tuning.health.grace_ms
        && state.transition(GamePhase::Playing, now).is_err()
    {
        log::warn!("Grace period ended outside of Starting");
    }

    if state.phase == GamePhase::Playing {
        let drain = if state.power_ups.rush.active {
            tuning.health.drain_rush
        } else {
            tuning.health.drain
        };
        state.damage(drain * k);
    }

    resolve_collectibles(state, tuning, now, k);
    resolve_lasers(state, tuning);
    expire_power_ups(state, tuning, now);

    if state.health() <= 0.0 {
        match state.transition(GamePhase::GameOver, now) {
            Ok(()) => {
                let score = state.score;
                state.events.push(GameEvent::GameOver { score });
                log::info!("Game over: score {} after {} ticks", score, state.time_ticks);
            }
            Err(e) => log::warn!("Could not end run: {}", e),
        }
    }

    state.refresh_hud(now);
}

/// Steering for idle mode: dodge nearby laser heads, otherwise chase the
/// most attractive pickup (power-ups count as closer than they are).
pub fn autopilot_axes(state: &GameState) -> InputAxes {
    let ball = &state.ball;
    let danger = ball.radius * 3.0;

    let threat = state
        .lasers
        .iter()
        .filter(|l| l.active)
        .map(|l| (l, l.head.distance(ball.pos)))
        .filter(|(_, d)| *d < danger)
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    if let Some((laser, _)) = threat {
        // Step off the beam's line rather than running along it
        let across = Vec2::new(-laser.step.y, laser.step.x);
        let side = if across.dot(ball.pos - laser.head) >= 0.0 {
            across
        } else {
            -across
        };
        return steer(side, 0.0);
    }

    let target = state
        .collectibles
        .iter()
        .filter(|c| c.pos.y > 0.0)
        .map(|c| {
            let weight = if c.kind.is_power_up() { 0.5 } else { 1.0 };
            (c.pos, c.pos.distance(ball.pos) * weight)
        })
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    match target {
        Some((pos, _)) => steer(pos - ball.pos, ball.radius * 0.5),
        // Nothing to chase: drift back toward the middle
        None => steer(state.arena.center() - ball.pos, ball.radius * 2.0),
    }
}

fn steer(delta: Vec2, dead_zone: f32) -> InputAxes {
    let axis = |v: f32| {
        if v.abs() <= dead_zone {
            0
        } else {
            v.signum() as i32
        }
    };
    InputAxes::new(axis(delta.x), axis(delta.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Arena, Collectible, CollectibleKind, Laser, OilSpill};

    const FRAME_MS: u64 = 16;

    fn started() -> (GameState, Tuning) {
        let tuning = Tuning::default();
        let arena = Arena::new(800.0, 600.0, &tuning).unwrap();
        let mut state = GameState::new(12345, arena, &tuning);
        state.begin_run(&tuning, 0).unwrap();
        (state, tuning)
    }

    fn idle() -> TickInput {
        TickInput {
            idle_mode: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_menu_tick_is_noop() {
        let tuning = Tuning::default();
        let arena = Arena::new(800.0, 600.0, &tuning).unwrap();
        let mut state = GameState::new(1, arena, &tuning);
        let before = state.ball.clone();

        tick(&mut state, &tuning, &TickInput::default(), 100, SIM_DT);
        assert_eq!(state.phase, GamePhase::Menu);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.ball, before);
        assert!(state.collectibles.is_empty());
    }

    #[test]
    fn test_grace_period_then_drain() {
        let (mut state, tuning) = started();
        let input = TickInput::default();

        tick(&mut state, &tuning, &input, 2999, SIM_DT);
        assert_eq!(state.phase, GamePhase::Starting);
        assert_eq!(state.health(), 100.0);

        tick(&mut state, &tuning, &input, 3000, SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!((state.health() - (100.0 - tuning.health.drain)).abs() < 1e-4);
    }

    #[test]
    fn test_health_runs_out() {
        let (mut state, tuning) = started();
        let input = TickInput::default();
        tick(&mut state, &tuning, &input, 3000, SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);

        state.collectibles.clear();
        state.score = 420;
        state.set_health(0.1);
        state.events.clear();
        tick(&mut state, &tuning, &input, 3016, SIM_DT);

        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.health(), 0.0);
        assert!(state.events.contains(&GameEvent::GameOver { score: 420 }));
        assert_eq!(state.hud.phase, GamePhase::GameOver);

        // Further ticks do nothing
        let ticks = state.time_ticks;
        tick(&mut state, &tuning, &input, 3032, SIM_DT);
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_input_pushes_ball() {
        let (mut state, tuning) = started();
        let input = TickInput {
            axes: InputAxes::new(1, 0),
            idle_mode: false,
        };
        tick(&mut state, &tuning, &input, FRAME_MS, SIM_DT);
        assert!(state.ball.vel.x > 0.0);
        assert!(state.ball.pos.x > state.arena.center().x);
    }

    #[test]
    fn test_oil_halves_speed_cap() {
        let (mut state, tuning) = started();
        let pos = state.ball.pos;
        state.oil_spills.push(OilSpill {
            id: 99,
            pos,
            radius: 120.0,
            points: vec![
                Vec2::new(-100.0, -100.0),
                Vec2::new(100.0, -100.0),
                Vec2::new(100.0, 100.0),
                Vec2::new(-100.0, 100.0),
            ],
            speed: 0.0,
        });
        state.ball.vel = Vec2::new(10.0, 0.0);

        tick(&mut state, &tuning, &TickInput::default(), FRAME_MS, SIM_DT);
        assert!(state.in_oil);
        assert!(state.ball.speed() <= 2.5 + 1e-4);
    }

    #[test]
    fn test_rush_overrides_oil() {
        let (mut state, tuning) = started();
        let pos = state.ball.pos;
        state.oil_spills.push(OilSpill {
            id: 99,
            pos,
            radius: 120.0,
            points: vec![
                Vec2::new(-100.0, -100.0),
                Vec2::new(100.0, -100.0),
                Vec2::new(100.0, 100.0),
                Vec2::new(-100.0, 100.0),
            ],
            speed: 0.0,
        });
        state.power_ups.rush.activate(0, 7000);
        state.sync_ball_radius(&tuning);
        state.ball.vel = Vec2::new(10.0, 0.0);

        tick(&mut state, &tuning, &TickInput::default(), FRAME_MS, SIM_DT);
        assert!(state.in_oil);
        assert!((state.ball.speed() - 6.25).abs() < 1e-3);
    }

    #[test]
    fn test_determinism() {
        let (mut a, tuning) = started();
        let (mut b, _) = started();
        for i in 1..=2000u64 {
            let now = i * FRAME_MS;
            tick(&mut a, &tuning, &idle(), now, SIM_DT);
            tick(&mut b, &tuning, &idle(), now, SIM_DT);
        }
        assert_eq!(a.score, b.score);
        assert_eq!(a.phase, b.phase);
        assert_eq!(a.ball, b.ball);
        assert_eq!(a.collectibles, b.collectibles);
        assert_eq!(a.lasers, b.lasers);
        assert_eq!(a.oil_spills, b.oil_spills);
        assert_eq!(a.health(), b.health());
    }

    #[test]
    fn test_autopilot_chases_pickups() {
        let (mut state, _) = started();
        let right = state.ball.pos + Vec2::new(200.0, 0.0);
        state.collectibles.push(Collectible {
            id: 1,
            kind: CollectibleKind::Regular,
            pos: right,
            radius: 25.0,
            speed: 2.0,
        });
        assert_eq!(autopilot_axes(&state), InputAxes::new(1, 0));

        // A power-up a little further away wins over the bean
        let up_left = state.ball.pos + Vec2::new(-250.0, -100.0);
        state.collectibles.push(Collectible {
            id: 2,
            kind: CollectibleKind::Coffee,
            pos: up_left,
            radius: 30.0,
            speed: 2.0,
        });
        assert_eq!(autopilot_axes(&state), InputAxes::new(-1, -1));
    }

    #[test]
    fn test_autopilot_dodges_laser() {
        let (mut state, _) = started();
        let pos = state.ball.pos;
        // Horizontal beam sweeping right, head just above the ball
        let mut beam = Laser::new(5, Vec2::new(0.0, pos.y - 20.0), Vec2::new(800.0, pos.y - 20.0), 10.5, 8.0);
        beam.head = Vec2::new(pos.x - 40.0, pos.y - 20.0);
        state.lasers.push(beam);
        let axes = autopilot_axes(&state);
        assert_eq!(axes, InputAxes::new(0, 1));
    }
}
