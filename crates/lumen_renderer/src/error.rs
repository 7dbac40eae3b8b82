use lumen_lights::LightError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Buffers or viewport disagree with the tile grid. Fatal for the frame.
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error(transparent)]
    Light(#[from] LightError),
    #[error("renderer is not running")]
    NotRunning,
}

pub type RenderResult<T> = Result<T, RenderError>;
