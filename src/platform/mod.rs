//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Time (monotonic clock, injectable for tests)
//! - Input (held keys and drag gestures reduced to two signed axes)
//! - Browser glue (logging, storage handle lookup)

pub mod input;
pub mod time;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use input::{DragTracker, HeldKeys, InputAxes};
pub use time::{Clock, FakeClock, SystemClock};
