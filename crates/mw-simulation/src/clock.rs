/// Tracks simulation time: a monotonic tick counter and elapsed seconds.
///
/// Every call to [`advance`](SimClock::advance) counts as a tick, even when
/// the supplied delta is zero or negative. Only positive deltas move the
/// elapsed time forward.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    tick: u64,
    elapsed: f64,
}

/// Clamp a raw frame delta to a usable step length.
///
/// Negative and NaN deltas become zero.
pub fn sanitize_delta(delta: f32) -> f32 {
    if delta > 0.0 && delta.is_finite() {
        delta
    } else {
        0.0
    }
}

impl SimClock {
    /// A clock at tick zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by one tick. Returns the new tick number and the
    /// sanitized delta.
    pub fn advance(&mut self, delta: f32) -> (u64, f32) {
        let delta = sanitize_delta(delta);
        self.tick += 1;
        self.elapsed += f64::from(delta);
        (self.tick, delta)
    }

    /// Return the current tick number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Total simulated seconds since the start.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_initial_state() {
        let clock = SimClock::new();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.elapsed(), 0.0);
    }

    #[test]
    fn clock_advance_increments() {
        let mut clock = SimClock::new();
        clock.advance(0.5);
        clock.advance(0.5);
        let (tick, delta) = clock.advance(1.0);
        assert_eq!(tick, 3);
        assert_eq!(delta, 1.0);
        assert!((clock.elapsed() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn degenerate_deltas_still_count_ticks() {
        let mut clock = SimClock::new();
        assert_eq!(clock.advance(-1.0), (1, 0.0));
        assert_eq!(clock.advance(f32::NAN), (2, 0.0));
        assert_eq!(clock.advance(0.0), (3, 0.0));
        assert_eq!(clock.elapsed(), 0.0);
    }
}
