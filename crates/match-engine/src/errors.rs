use thiserror::Error;

/// Engine-level error type.
///
/// AI-enhancement failures are deliberately absent: the enhancement
/// collaborator has its own error type (`matching::enhancement::EnhanceError`)
/// and is absorbed inside the ranking service, never surfaced to callers.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("malformed entity: {0}")]
    MalformedEntity(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
