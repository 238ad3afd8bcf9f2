use std::fmt;

use thiserror::Error;
use xmlapi_core::XmlApiError;

/// Which side of a reconciliation a codec failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Write,
    Delete,
    Move,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Read => "read",
            Stage::Write => "write",
            Stage::Delete => "delete",
            Stage::Move => "move",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidLocation,
    InvalidPosition,
    MissingPivotPoint,
    MissingUuid,
    Marshaling,
    Cancelled,
    Transport,
    Internal,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("object not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid location: {0}")]
    InvalidLocation(String),
    #[error("invalid position: {0}")]
    InvalidPosition(String),
    #[error("pivot point `{0}` is missing from the device")]
    MissingPivotPoint(String),
    #[error("entry `{0}` has no uuid")]
    MissingUuid(String),
    #[error("failed to marshal entry `{name}`: {message}")]
    Marshaling { name: String, message: String },
    #[error("operation cancelled")]
    Cancelled,
    #[error("failed to {stage} entries: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: XmlApiError,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotFound => ErrorKind::NotFound,
            SyncError::Conflict(_) => ErrorKind::Conflict,
            SyncError::InvalidLocation(_) => ErrorKind::InvalidLocation,
            SyncError::InvalidPosition(_) => ErrorKind::InvalidPosition,
            SyncError::MissingPivotPoint(_) => ErrorKind::MissingPivotPoint,
            SyncError::MissingUuid(_) => ErrorKind::MissingUuid,
            SyncError::Marshaling { .. } => ErrorKind::Marshaling,
            SyncError::Cancelled => ErrorKind::Cancelled,
            SyncError::Transport { .. } => ErrorKind::Transport,
            SyncError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound)
    }

    /// Maps a codec error. The object-not-found sentinel becomes
    /// [`SyncError::NotFound`] on reads and deletes; elsewhere it keeps its
    /// stage.
    pub(crate) fn from_codec(stage: Stage, source: XmlApiError) -> Self {
        if source.is_object_not_found() && matches!(stage, Stage::Read | Stage::Delete) {
            SyncError::NotFound
        } else {
            SyncError::Transport { stage, source }
        }
    }
}
