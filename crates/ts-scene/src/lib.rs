//! Scene orchestration for Tessera.
//!
//! A [`Scene`] binds one manager per behaviour type, schedules their passes,
//! spawns entities and drives ticks: every scheduled pass in order, then a
//! full drain of the scene's event service.

/// The scene clock.
pub mod clock;
/// Scene configuration.
pub mod config;
/// Error types for scene operations.
pub mod error;
/// The scene orchestrator.
pub mod scene;

pub use clock::SceneClock;
pub use config::SceneConfig;
pub use error::{SceneError, SceneResult};
pub use scene::Scene;
