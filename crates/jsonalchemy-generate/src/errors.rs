use thiserror::Error;

use jsonalchemy_core::SchemaError;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

impl GenerationError {
    /// The schema error behind this failure, if any.
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            GenerationError::Schema(err) => Some(err),
            GenerationError::InvalidOptions(_) => None,
        }
    }
}
