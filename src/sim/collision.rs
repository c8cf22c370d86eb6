//! Collision detection and effect resolution
//!
//! Circle-circle tests for pickups and laser heads, circle pre-check plus an
//! even-odd point-in-polygon test for oil spills. Hits mutate score, health
//! and power-up timers on the game state.

use glam::Vec2;

use super::state::{CollectibleKind, GameEvent, GameState, OilSpill, PowerUpKind};
use crate::tuning::Tuning;

/// True when two circles overlap (distance strictly less than the radii sum)
#[inline]
pub fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    a.distance(b) < a_radius + b_radius
}

/// Even-odd rule ray cast against a closed polygon
pub fn point_in_polygon(point: Vec2, vertices: &[Vec2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (vi, vj) = (vertices[i], vertices[j]);
        if (vi.y > point.y) != (vj.y > point.y)
            && point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Whether the ball's center lies inside the spill's outline
pub fn ball_in_oil(ball_pos: Vec2, ball_radius: f32, spill: &OilSpill) -> bool {
    if !circles_overlap(ball_pos, ball_radius, spill.pos, spill.radius) {
        return false;
    }
    let outline: Vec<Vec2> = spill.world_points().collect();
    point_in_polygon(ball_pos, &outline)
}

/// Update `in_oil` for this tick; the speed cap reads it during integration
pub fn resolve_oil(state: &mut GameState) -> bool {
    let was_in_oil = state.in_oil;
    let (pos, radius) = (state.ball.pos, state.ball.radius);
    state.in_oil = state.oil_spills.iter().any(|spill| ball_in_oil(pos, radius, spill));
    if state.in_oil && !was_in_oil {
        state.events.push(GameEvent::EnteredOil);
    }
    state.in_oil
}

/// Move pickups (falling, or pulled by the magnet) and collect the ones touched
pub fn resolve_collectibles(state: &mut GameState, tuning: &Tuning, now: u64, k: f32) {
    let magnet_on = state.power_ups.magnet.active;
    let magnet_radius = state.arena.magnet_radius;
    let pull = &tuning.ball;
    let height = state.arena.height;

    let mut remaining = Vec::with_capacity(state.collectibles.len());
    for mut item in std::mem::take(&mut state.collectibles) {
        let to_ball = state.ball.pos - item.pos;
        let distance = to_ball.length();

        if magnet_on && !item.kind.is_power_up() && distance < magnet_radius {
            if distance > 0.0 {
                let dir = to_ball / distance;
                item.pos.x += dir.x * pull.magnet_pull_speed * k;
                item.pos.y += (dir.y * pull.magnet_pull_speed * pull.magnet_vertical_damping
                    + pull.magnet_vertical_bias)
                    * k;
            }
        } else {
            item.pos.y += item.speed * k;
        }

        if circles_overlap(item.pos, item.radius, state.ball.pos, state.ball.radius) {
            collect(state, tuning, item.kind, now);
            continue;
        }
        if item.pos.y > height {
            continue;
        }
        remaining.push(item);
    }
    state.collectibles = remaining;
}

fn collect(state: &mut GameState, tuning: &Tuning, kind: CollectibleKind, now: u64) {
    let health = &tuning.health;
    let points = match kind {
        CollectibleKind::Regular => {
            state.heal(health.regular_heal);
            health.regular_points
        }
        CollectibleKind::Coffee => {
            state.set_health(state.max_health());
            activate_rush(state, tuning, now);
            health.power_up_points
        }
        CollectibleKind::Magnet => {
            state.power_ups.magnet.activate(now, tuning.power_ups.magnet_ms);
            state.events.push(GameEvent::PowerUpStarted(PowerUpKind::Magnet));
            log::debug!("Magnet active until {}", state.power_ups.magnet.expires_at);
            health.power_up_points
        }
    };
    state.score += points;
    state.events.push(GameEvent::Collected { kind, points });
}

/// Rush: bigger and faster ball, plus an immediate velocity kick
fn activate_rush(state: &mut GameState, tuning: &Tuning, now: u64) {
    let multiplier = tuning.power_ups.rush_multiplier;
    state.power_ups.rush.activate(now, tuning.power_ups.rush_ms);
    state.sync_ball_radius(tuning);
    state.ball.vel *= multiplier;
    state.events.push(GameEvent::PowerUpStarted(PowerUpKind::Rush));
    log::debug!("Rush active until {}", state.power_ups.rush.expires_at);
}

/// Laser heads touching the ball deal damage once, then switch off
pub fn resolve_lasers(state: &mut GameState, tuning: &Tuning) {
    let (pos, radius) = (state.ball.pos, state.ball.radius);
    let mut hits = 0;
    for beam in state.lasers.iter_mut().filter(|b| b.active) {
        if circles_overlap(pos, radius, beam.head, beam.width) {
            beam.active = false;
            hits += 1;
        }
    }
    for _ in 0..hits {
        state.damage(tuning.laser.damage);
        state.events.push(GameEvent::LaserHit {
            damage: tuning.laser.damage,
        });
    }
}

/// End power-ups whose time is up; a no-op for ones already inactive
pub fn expire_power_ups(state: &mut GameState, tuning: &Tuning, now: u64) {
    if state.power_ups.rush.expire(now) {
        state.sync_ball_radius(tuning);
        state.events.push(GameEvent::PowerUpEnded(PowerUpKind::Rush));
        log::debug!("Rush ended");
    }
    if state.power_ups.magnet.expire(now) {
        state.events.push(GameEvent::PowerUpEnded(PowerUpKind::Magnet));
        log::debug!("Magnet ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Arena, Collectible, Laser};
    use proptest::prelude::*;

    fn running_state() -> (GameState, Tuning) {
        let tuning = Tuning::default();
        let arena = Arena::new(800.0, 600.0, &tuning).unwrap();
        let mut state = GameState::new(1, arena, &tuning);
        state.begin_run(&tuning, 0).unwrap();
        (state, tuning)
    }

    fn item(state: &mut GameState, kind: CollectibleKind, pos: Vec2, radius: f32) -> Collectible {
        Collectible {
            id: state.next_entity_id(),
            kind,
            pos,
            radius,
            speed: 0.0,
        }
    }

    fn square_spill(pos: Vec2, half: f32) -> OilSpill {
        OilSpill {
            id: 1,
            pos,
            radius: half * 1.5,
            points: vec![
                Vec2::new(-half, -half),
                Vec2::new(half, -half),
                Vec2::new(half, half),
                Vec2::new(-half, half),
            ],
            speed: 0.0,
        }
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Vec2::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(Vec2::new(15.0, 5.0), &square));
        assert!(!point_in_polygon(Vec2::new(5.0, -1.0), &square));
        assert!(!point_in_polygon(Vec2::new(5.0, 5.0), &square[..2]));
    }

    #[test]
    fn test_point_in_concave_star() {
        // Arrow shape with a notch on the right side
        let shape = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(5.0, 5.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Vec2::new(2.0, 5.0), &shape));
        assert!(!point_in_polygon(Vec2::new(8.0, 5.0), &shape));
    }

    #[test]
    fn test_regular_pickup_at_full_health() {
        let (mut state, tuning) = running_state();
        let pos = state.ball.pos;
        // Ball radius 30 + bean radius 20 = 50, distance 0
        let bean = item(&mut state, CollectibleKind::Regular, pos, 20.0);
        state.collectibles.push(bean);

        resolve_collectibles(&mut state, &tuning, 100, 1.0);
        assert_eq!(state.health(), 100.0);
        assert_eq!(state.score, 10);
        assert!(state.collectibles.is_empty());
    }

    #[test]
    fn test_regular_pickup_heals() {
        let (mut state, tuning) = running_state();
        state.set_health(55.0);
        let pos = state.ball.pos + Vec2::new(40.0, 0.0);
        let bean = item(&mut state, CollectibleKind::Regular, pos, 25.0);
        state.collectibles.push(bean);

        resolve_collectibles(&mut state, &tuning, 100, 1.0);
        assert_eq!(state.health(), 65.0);
    }

    #[test]
    fn test_coffee_pickup_starts_rush() {
        let (mut state, tuning) = running_state();
        state.set_health(20.0);
        state.ball.vel = Vec2::new(4.0, 0.0);
        let pos = state.ball.pos;
        let cup = item(&mut state, CollectibleKind::Coffee, pos, 30.0);
        state.collectibles.push(cup);

        resolve_collectibles(&mut state, &tuning, 1000, 1.0);
        assert_eq!(state.health(), 100.0);
        assert_eq!(state.score, 20);
        assert!(state.power_ups.rush.active);
        assert_eq!(state.power_ups.rush.expires_at, 8000);
        assert_eq!(state.ball.radius, 37.5);
        assert_eq!(state.ball.vel, Vec2::new(5.0, 0.0));
        assert!(state.events.contains(&GameEvent::PowerUpStarted(PowerUpKind::Rush)));
    }

    #[test]
    fn test_magnet_pickup_and_pull() {
        let (mut state, tuning) = running_state();
        let pos = state.ball.pos;
        let magnet = item(&mut state, CollectibleKind::Magnet, pos, 30.0);
        state.collectibles.push(magnet);
        resolve_collectibles(&mut state, &tuning, 0, 1.0);
        assert!(state.power_ups.magnet.active);
        assert_eq!(state.score, 20);

        // Bean to the left inside the magnet radius moves toward the ball
        let start = state.ball.pos - Vec2::new(150.0, 0.0);
        let bean = item(&mut state, CollectibleKind::Regular, start, 25.0);
        state.collectibles.push(bean);
        resolve_collectibles(&mut state, &tuning, 16, 1.0);
        let moved = state.collectibles[0].pos;
        assert!((moved.x - (start.x + 4.0)).abs() < 1e-4);
        assert!((moved.y - (start.y + 1.0)).abs() < 1e-4);

        // Power-ups ignore the magnet and keep falling
        let far = state.ball.pos - Vec2::new(100.0, 0.0);
        let mut cup = item(&mut state, CollectibleKind::Coffee, far, 30.0);
        cup.speed = 2.0;
        state.collectibles = vec![cup];
        resolve_collectibles(&mut state, &tuning, 32, 1.0);
        assert_eq!(state.collectibles[0].pos, far + Vec2::new(0.0, 2.0));
    }

    #[test]
    fn test_magnet_ignores_beans_outside_radius() {
        let (mut state, tuning) = running_state();
        state.power_ups.magnet.activate(0, tuning.power_ups.magnet_ms);

        let radius = state.arena.magnet_radius;
        let start = state.ball.pos - Vec2::new(radius + 60.0, 0.0);
        let mut bean = item(&mut state, CollectibleKind::Regular, start, 20.0);
        bean.speed = 2.0;
        state.collectibles.push(bean);
        resolve_collectibles(&mut state, &tuning, 16, 1.0);

        assert!(state.power_ups.magnet.active);
        assert_eq!(state.collectibles.len(), 1);
        assert_eq!(state.collectibles[0].pos, start + Vec2::new(0.0, 2.0));
    }

    #[test]
    fn test_offscreen_pickups_removed() {
        let (mut state, tuning) = running_state();
        let mut bean = item(&mut state, CollectibleKind::Regular, Vec2::new(10.0, 599.0), 25.0);
        bean.speed = 2.0;
        state.collectibles.push(bean);
        resolve_collectibles(&mut state, &tuning, 0, 1.0);
        assert!(state.collectibles.is_empty());
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_oil_detection_uses_outline() {
        let (mut state, _) = running_state();
        let center = state.ball.pos;
        state.oil_spills.push(square_spill(center + Vec2::new(20.0, 0.0), 40.0));
        assert!(resolve_oil(&mut state));
        assert_eq!(state.events.last(), Some(&GameEvent::EnteredOil));

        // Bounding circles overlap but the center is outside the outline
        state.oil_spills[0] = square_spill(center + Vec2::new(60.0, 0.0), 40.0);
        assert!(!resolve_oil(&mut state));
    }

    #[test]
    fn test_laser_hits_once() {
        let (mut state, tuning) = running_state();
        let head = state.ball.pos + Vec2::new(30.0, 0.0);
        let mut beam = Laser::new(9, head, head + Vec2::new(500.0, 0.0), 10.5, 8.0);
        beam.head = head;
        state.lasers.push(beam);

        resolve_lasers(&mut state, &tuning);
        assert_eq!(state.health(), 70.0);
        assert!(!state.lasers[0].active);

        resolve_lasers(&mut state, &tuning);
        assert_eq!(state.health(), 70.0);
    }

    #[test]
    fn test_laser_damage_clamps_at_zero() {
        let (mut state, tuning) = running_state();
        state.set_health(10.0);
        let head = state.ball.pos;
        state.lasers.push(Laser::new(2, head, head + Vec2::new(0.0, 300.0), 10.5, 8.0));
        resolve_lasers(&mut state, &tuning);
        assert_eq!(state.health(), 0.0);
    }

    #[test]
    fn test_expiry_restores_radius_once() {
        let (mut state, tuning) = running_state();
        activate_rush(&mut state, &tuning, 0);
        assert_eq!(state.ball.radius, 37.5);

        expire_power_ups(&mut state, &tuning, 7000);
        assert!(state.power_ups.rush.active);

        state.events.clear();
        expire_power_ups(&mut state, &tuning, 7001);
        assert!(!state.power_ups.rush.active);
        assert_eq!(state.ball.radius, 30.0);
        assert_eq!(state.events, vec![GameEvent::PowerUpEnded(PowerUpKind::Rush)]);

        expire_power_ups(&mut state, &tuning, 9000);
        assert_eq!(state.events.len(), 1);
        assert_eq!(state.ball.radius, 30.0);
    }

    proptest! {
        #[test]
        fn prop_overlap_is_symmetric(
            ax in -500.0f32..500.0, ay in -500.0f32..500.0, ar in 0.0f32..100.0,
            bx in -500.0f32..500.0, by in -500.0f32..500.0, br in 0.0f32..100.0,
        ) {
            let a = Vec2::new(ax, ay);
            let b = Vec2::new(bx, by);
            prop_assert_eq!(circles_overlap(a, ar, b, br), circles_overlap(b, br, a, ar));
        }

        #[test]
        fn prop_health_stays_in_range(events in prop::collection::vec((0u8..3, 0.0f32..60.0), 0..100)) {
            let (mut state, _) = running_state();
            for (op, amount) in events {
                match op {
                    0 => state.heal(amount),
                    1 => state.damage(amount),
                    _ => state.set_health(amount * 3.0 - 40.0),
                }
                prop_assert!((0.0..=100.0).contains(&state.health()));
            }
        }
    }
}
