use serde::{Deserialize, Serialize};
use ts_core::Timestep;
use ts_events::EventServiceConfig;

use crate::error::{SceneError, SceneResult};

/// Configuration for a scene.
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// RNG seed for deterministic runs.
    pub seed: u64,
    /// How simulated time advances.
    pub timestep: Timestep,
    /// Flip cap for each event drain. `None` drains until empty.
    pub max_drain_flips: Option<usize>,
    /// Most fixed ticks a single `advance` call may run. Backlog beyond
    /// that is dropped.
    pub max_catch_up_ticks: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            timestep: Timestep::default(),
            max_drain_flips: None,
            max_catch_up_ticks: 8,
        }
    }
}

impl SceneConfig {
    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the timestep.
    pub fn with_timestep(mut self, timestep: Timestep) -> Self {
        self.timestep = timestep;
        self
    }

    /// Shorthand for a fixed timestep of `dt` seconds.
    pub fn with_fixed_dt(self, dt: f32) -> Self {
        self.with_timestep(Timestep::Fixed { dt })
    }

    /// Cap the flips of each event drain.
    pub fn with_max_drain_flips(mut self, max: usize) -> Self {
        self.max_drain_flips = Some(max);
        self
    }

    /// Set how many fixed ticks one `advance` call may run.
    pub fn with_max_catch_up_ticks(mut self, max: u32) -> Self {
        self.max_catch_up_ticks = max;
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> SceneResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> SceneResult<()> {
        let limit = self.timestep.limit();
        if !(limit.is_finite() && limit > 0.0) {
            return Err(SceneError::Config(format!(
                "timestep must be positive and finite, got {limit}"
            )));
        }
        if self.max_drain_flips == Some(0) {
            return Err(SceneError::Config(
                "max_drain_flips must be at least 1".into(),
            ));
        }
        if self.max_catch_up_ticks == 0 {
            return Err(SceneError::Config(
                "max_catch_up_ticks must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The event service settings derived from this configuration.
    pub fn event_service(&self) -> EventServiceConfig {
        EventServiceConfig {
            max_flips: self.max_drain_flips,
        }
    }
}
