//! Render sink
//!
//! The simulation never draws. Each frame the driver captures an owned
//! [`FrameSnapshot`] that a renderer (canvas, WebGPU, terminal) consumes;
//! [`instance::pack`] flattens it into GPU upload buffers.

pub mod instance;

use serde::Serialize;

use crate::sim::{Ball, Collectible, GamePhase, GameState, Hud, Laser, Obstacle, OilSpill};

pub use instance::{FrameInstances, Instance, pack};

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub width: f32,
    pub height: f32,
    pub ground_y: f32,
    pub phase: GamePhase,
    pub ball: Ball,
    pub collectibles: Vec<Collectible>,
    pub obstacles: Vec<Obstacle>,
    pub lasers: Vec<Laser>,
    pub oil_spills: Vec<OilSpill>,
    pub in_oil: bool,
    pub hud: Hud,
}

impl FrameSnapshot {
    pub fn capture(state: &GameState) -> Self {
        Self {
            width: state.arena.width,
            height: state.arena.height,
            ground_y: state.arena.ground_y,
            phase: state.phase,
            ball: state.ball.clone(),
            collectibles: state.collectibles.clone(),
            obstacles: state.obstacles.clone(),
            lasers: state.lasers.clone(),
            oil_spills: state.oil_spills.clone(),
            in_oil: state.in_oil,
            hud: state.hud,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Anything that can present a frame. Failures stay inside the sink.
pub trait RenderSink {
    fn present(&mut self, frame: &FrameSnapshot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Arena;
    use crate::tuning::Tuning;

    #[test]
    fn test_capture_copies_state() {
        let tuning = Tuning::default();
        let arena = Arena::new(500.0, 700.0, &tuning).unwrap();
        let mut state = GameState::new(1, arena, &tuning);
        state.begin_run(&tuning, 0).unwrap();
        state.score = 40;
        state.refresh_hud(0);

        let frame = FrameSnapshot::capture(&state);
        assert_eq!(frame.width, 500.0);
        assert_eq!(frame.ground_y, 650.0);
        assert_eq!(frame.phase, GamePhase::Starting);
        assert_eq!(frame.hud.score, 40);
        assert_eq!(frame.ball, state.ball);

        let json = frame.to_json().unwrap();
        assert!(json.contains("\"score\":40"));
    }
}
