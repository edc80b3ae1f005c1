use std::time::Instant;

/// Timing for a single frame, handed to module updates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTime {
    /// Frame index, starting at 1 for the first tick.
    pub frame: u64,
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds accumulated since the clock started.
    pub elapsed: f64,
}

/// Monotonic per-frame clock.
///
/// `tick` measures wall time between calls; `advance` steps by a fixed delta
/// for deterministic runs. Deltas are clamped to `[0, max_delta]` so a stall
/// (debugger, file reload) does not produce one enormous step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame: u64,
    elapsed: f64,
    max_delta: f32,
    last_instant: Option<Instant>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub const DEFAULT_MAX_DELTA: f32 = 0.25;

    pub fn new() -> Self {
        Self::with_max_delta(Self::DEFAULT_MAX_DELTA)
    }

    pub fn with_max_delta(max_delta: f32) -> Self {
        Self {
            frame: 0,
            elapsed: 0.0,
            max_delta,
            last_instant: None,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advance by wall-clock time since the previous tick. The first tick
    /// reports a zero delta.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let delta = self
            .last_instant
            .map(|prev| now.duration_since(prev).as_secs_f32())
            .unwrap_or(0.0);
        self.last_instant = Some(now);
        self.advance(delta)
    }

    /// Advance by an explicit delta.
    pub fn advance(&mut self, delta: f32) -> FrameTime {
        let delta = if delta.is_finite() {
            delta.clamp(0.0, self.max_delta)
        } else {
            0.0
        };
        self.frame += 1;
        self.elapsed += delta as f64;
        FrameTime {
            frame: self.frame,
            delta,
            elapsed: self.elapsed,
        }
    }

    /// Reset to frame 0, e.g. when leaving play mode.
    pub fn reset(&mut self) {
        self.frame = 0;
        self.elapsed = 0.0;
        self.last_instant = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates() {
        let mut clock = FrameClock::new();
        clock.advance(0.1);
        let t = clock.advance(0.1);
        assert_eq!(t.frame, 2);
        assert!((t.elapsed - 0.2).abs() < 1e-6);
    }

    #[test]
    fn delta_is_clamped() {
        let mut clock = FrameClock::with_max_delta(0.05);
        assert_eq!(clock.advance(1.0).delta, 0.05);
        assert_eq!(clock.advance(-1.0).delta, 0.0);
        assert_eq!(clock.advance(f32::NAN).delta, 0.0);
    }

    #[test]
    fn first_tick_has_zero_delta() {
        let mut clock = FrameClock::new();
        let t = clock.tick();
        assert_eq!(t.frame, 1);
        assert_eq!(t.delta, 0.0);
        assert!(clock.tick().delta >= 0.0);
    }

    #[test]
    fn reset_returns_to_frame_zero() {
        let mut clock = FrameClock::new();
        clock.advance(0.1);
        clock.reset();
        assert_eq!(clock.frame(), 0);
        assert_eq!(clock.elapsed(), 0.0);
    }
}
