use ts_core::{CoreError, EntityId};
use ts_events::EventError;

/// Alias for `Result<T, SceneError>`.
pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("entity not found in scene: {0}")]
    EntityNotFound(EntityId),

    #[error("invalid scene configuration: {0}")]
    Config(String),

    #[error("could not parse scene configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
