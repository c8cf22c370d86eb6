//! Monotonic time source
//!
//! Spawn gating, power-up expiry and the grace period all compare
//! millisecond timestamps taken from a [`Clock`]. The clock is injected into
//! the frame driver so tests can step time by hand.

use std::cell::Cell;
use std::rc::Rc;

/// Millisecond time source
pub trait Clock {
    /// Monotonic milliseconds since an arbitrary origin
    fn now_ms(&self) -> u64;

    /// Wall-clock timestamp (Unix ms) used to stamp score entries
    fn timestamp_ms(&self) -> f64 {
        self.now_ms() as f64
    }
}

/// Real clock: `performance.now()` on the web, `Instant` natively
#[derive(Debug, Clone)]
pub struct SystemClock {
    #[cfg(not(target_arch = "wasm32"))]
    origin: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn timestamp_ms(&self) -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0)
    }
}

#[cfg(target_arch = "wasm32")]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now() as u64)
            .unwrap_or_else(|| js_sys::Date::now() as u64)
    }

    fn timestamp_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

/// Hand-stepped clock for deterministic tests and headless runs
///
/// Clones share the same time, so a test can keep one handle while the
/// game owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    now: Rc<Cell<u64>>,
}

impl FakeClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_clones_share_time() {
        let clock = FakeClock::new(1000);
        let handle = clock.clone();
        handle.advance(250);
        assert_eq!(clock.now_ms(), 1250);
        clock.set(5);
        assert_eq!(handle.now_ms(), 5);
        assert_eq!(handle.timestamp_ms(), 5.0);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
        assert!(clock.timestamp_ms() > 0.0);
    }
}
