#![forbid(unsafe_code)]

use rusqlite::ErrorCode;
use sb_core::{ErrorKind, StatusTransitionError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(rusqlite::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("store busy: {0}")]
    Transient(rusqlite::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Sql(_) => ErrorKind::Internal,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Transient(_) => ErrorKind::Transient,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(message) if message.starts_with("RESET_REQUIRED") => {
                "RESET_REQUIRED"
            }
            other => other.kind().code(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if is_busy(&value) {
            Self::Transient(value)
        } else {
            Self::Sql(value)
        }
    }
}

impl From<StatusTransitionError> for StoreError {
    fn from(_: StatusTransitionError) -> Self {
        Self::InvalidState("pull request is no longer open")
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}
