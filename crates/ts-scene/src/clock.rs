/// Tracks scene time: a tick counter, elapsed simulated seconds and the
/// fixed-step accumulator.
#[derive(Debug, Clone, Default)]
pub struct SceneClock {
    tick: u64,
    elapsed: f64,
    accumulator: f32,
}

impl SceneClock {
    /// Create a clock at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tick of `dt` seconds. Returns the new tick number.
    pub fn advance(&mut self, dt: f32) -> u64 {
        self.tick += 1;
        self.elapsed += f64::from(dt);
        self.tick
    }

    /// Number of ticks run so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds covered by all ticks so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Wall time received but not yet simulated.
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Add wall time to the accumulator.
    pub fn accumulate(&mut self, seconds: f32) {
        self.accumulator += seconds;
    }

    /// Take one step of `dt` out of the accumulator, if it holds that much.
    pub fn consume(&mut self, dt: f32) -> bool {
        if self.accumulator < dt {
            return false;
        }
        self.accumulator -= dt;
        true
    }

    /// Drop whole steps still in the accumulator, keeping the remainder.
    /// Returns how many steps were dropped.
    pub fn discard_backlog(&mut self, dt: f32) -> u64 {
        let steps = (self.accumulator / dt).floor();
        self.accumulator -= steps * dt;
        steps as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_counts_ticks_and_time() {
        let mut clock = SceneClock::new();
        assert_eq!(clock.advance(0.5), 1);
        assert_eq!(clock.advance(0.25), 2);
        assert_eq!(clock.tick(), 2);
        assert!((clock.elapsed() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn accumulator_hands_out_whole_steps() {
        let mut clock = SceneClock::new();
        clock.accumulate(0.25);
        assert!(clock.consume(0.1));
        assert!(clock.consume(0.1));
        assert!(!clock.consume(0.1));
        assert!((clock.accumulator() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn backlog_is_dropped_but_remainder_kept() {
        let mut clock = SceneClock::new();
        clock.accumulate(1.0);
        assert_eq!(clock.discard_backlog(0.3), 3);
        assert!((clock.accumulator() - 0.1).abs() < 1e-5);
        assert_eq!(clock.tick(), 0);
    }
}
