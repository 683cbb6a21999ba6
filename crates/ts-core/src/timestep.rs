use serde::{Deserialize, Serialize};

/// How a scene advances simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Timestep {
    /// Every tick covers exactly `dt` seconds.
    Fixed {
        /// Seconds per tick.
        dt: f32,
    },
    /// Each tick covers the elapsed wall time, clamped to `max_dt`.
    Variable {
        /// Upper bound for a single tick.
        max_dt: f32,
    },
}

impl Default for Timestep {
    fn default() -> Self {
        Self::Fixed { dt: 1.0 / 60.0 }
    }
}

impl Timestep {
    /// The tick length, if it is fixed.
    pub fn fixed_dt(&self) -> Option<f32> {
        match *self {
            Self::Fixed { dt } => Some(dt),
            Self::Variable { .. } => None,
        }
    }

    /// Whether every tick has the same length.
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed { .. })
    }

    /// The step bound: `dt` for a fixed step, `max_dt` otherwise.
    pub fn limit(&self) -> f32 {
        match *self {
            Self::Fixed { dt } => dt,
            Self::Variable { max_dt } => max_dt,
        }
    }
}
