//! Ball integration
//!
//! Gravity, friction, a hard speed cap and damped bounces off the four
//! bounds. All per-tick amounts are scaled by `dt / SIM_DT`.

use glam::Vec2;

use super::state::{Arena, Ball};
use crate::consts::SIM_DT;
use crate::tuning::Tuning;

/// Coefficients for one integration step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsParams {
    /// Downward acceleration per tick
    pub gravity: f32,
    /// Velocity kept per tick, in (0, 1)
    pub friction: f32,
    /// Velocity kept after a bounce, in (0, 1)
    pub bounce: f32,
    pub max_speed: f32,
}

impl PhysicsParams {
    /// Scaled coefficients for the given arena and speed cap
    pub fn new(tuning: &Tuning, arena: &Arena, max_speed: f32) -> Self {
        Self {
            gravity: tuning.physics.gravity * arena.scale,
            friction: tuning.physics.friction,
            bounce: tuning.physics.bounce,
            max_speed,
        }
    }
}

/// Rescale a velocity so its length does not exceed `max_speed`
#[inline]
pub fn clamp_speed(vel: Vec2, max_speed: f32) -> Vec2 {
    let speed = vel.length();
    if speed > max_speed && speed > 0.0 {
        vel * (max_speed / speed)
    } else {
        vel
    }
}

/// Advance the ball by `dt` seconds
pub fn integrate(ball: &mut Ball, params: &PhysicsParams, dt: f32) {
    let k = dt / SIM_DT;

    ball.vel.y += params.gravity * k;
    ball.vel *= params.friction.powf(k);
    ball.vel = clamp_speed(ball.vel, params.max_speed);

    ball.pos += ball.vel * k;

    // Ground, then ceiling
    if ball.pos.y + ball.radius > ball.ground_y {
        ball.pos.y = ball.ground_y - ball.radius;
        ball.vel.y = -ball.vel.y.abs() * params.bounce;
    }
    if ball.pos.y - ball.radius < 0.0 {
        ball.pos.y = ball.radius;
        ball.vel.y = ball.vel.y.abs() * params.bounce;
    }

    // Side walls
    if ball.pos.x - ball.radius < 0.0 {
        ball.pos.x = ball.radius;
        ball.vel.x = ball.vel.x.abs() * params.bounce;
    } else if ball.pos.x + ball.radius > ball.max_x {
        ball.pos.x = ball.max_x - ball.radius;
        ball.vel.x = -ball.vel.x.abs() * params.bounce;
    }
}

/// Add an input force to the ball's velocity
pub fn apply_force(ball: &mut Ball, force: Vec2, multiplier: f32) {
    ball.vel += force * multiplier;
}
