use crate::types::ConflictKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Clip not found: {0}")]
    ClipNotFound(uuid::Uuid),

    #[error("Track not found: {0}")]
    TrackNotFound(uuid::Uuid),

    #[error("Transition not found: {0}")]
    TransitionNotFound(uuid::Uuid),

    #[error("Version not found: {0}")]
    VersionNotFound(u32),

    #[error("Invalid clip: {0}")]
    InvalidClip(String),

    #[error("Conflicts of type {0:?} cannot be fixed automatically")]
    NotAutoFixable(ConflictKind),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,
}

pub type Result<T> = std::result::Result<T, CoreError>;
