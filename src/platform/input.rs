//! Directional input sampling
//!
//! Keyboard and pointer handlers only record raw state here. The frame
//! driver samples an [`InputAxes`] snapshot once per frame and the
//! simulation turns it into a force before integrating the ball.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Directional intent on two independent axes, each in {-1, 0, 1}
///
/// Screen coordinates: +x is right, +y is down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAxes {
    pub x: i8,
    pub y: i8,
}

impl InputAxes {
    pub const NONE: Self = Self { x: 0, y: 0 };

    /// Build from arbitrary signed values, keeping only their sign
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x: x.signum() as i8,
            y: y.signum() as i8,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.x == 0 && self.y == 0
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

/// Keys currently held down (WASD and arrow keys)
#[derive(Debug, Clone, Copy, Default)]
pub struct HeldKeys {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
}

impl HeldKeys {
    /// Record a key press or release. Returns false for keys the game ignores.
    pub fn set(&mut self, key: &str, pressed: bool) -> bool {
        let slot = match key {
            "w" | "W" | "ArrowUp" => &mut self.up,
            "s" | "S" | "ArrowDown" => &mut self.down,
            "a" | "A" | "ArrowLeft" => &mut self.left,
            "d" | "D" | "ArrowRight" => &mut self.right,
            _ => return false,
        };
        *slot = pressed;
        true
    }

    /// Release everything (window blur)
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Opposite keys cancel out
    pub fn axes(&self) -> InputAxes {
        InputAxes::new(
            self.right as i32 - self.left as i32,
            self.down as i32 - self.up as i32,
        )
    }
}

/// Drag-to-steer: the offset from where the drag started picks the direction
#[derive(Debug, Clone, Copy)]
pub struct DragTracker {
    origin: Option<Vec2>,
    current: Vec2,
    /// Offsets shorter than this on an axis count as zero on that axis
    pub dead_zone: f32,
}

impl Default for DragTracker {
    fn default() -> Self {
        Self::new(12.0)
    }
}

impl DragTracker {
    pub fn new(dead_zone: f32) -> Self {
        Self {
            origin: None,
            current: Vec2::ZERO,
            dead_zone,
        }
    }

    pub fn begin(&mut self, x: f32, y: f32) {
        self.origin = Some(Vec2::new(x, y));
        self.current = Vec2::new(x, y);
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.current = Vec2::new(x, y);
    }

    pub fn end(&mut self) {
        self.origin = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.origin.is_some()
    }

    pub fn axes(&self) -> InputAxes {
        let Some(origin) = self.origin else {
            return InputAxes::NONE;
        };
        let delta = self.current - origin;
        let axis = |d: f32| {
            if d.abs() < self.dead_zone {
                0
            } else if d > 0.0 {
                1
            } else {
                -1
            }
        };
        InputAxes::new(axis(delta.x), axis(delta.y))
    }
}

/// Keyboard wins when any key is held, otherwise the drag decides
pub fn combine(keys: &HeldKeys, drag: &DragTracker) -> InputAxes {
    let from_keys = keys.axes();
    if from_keys.is_idle() { drag.axes() } else { from_keys }
}
