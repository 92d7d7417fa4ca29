use thiserror::Error;

/// Coarse classification of a [`RankError`]; match on this rather than on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    DuplicateMember,
    LengthMismatch,
    DegenerateSeries,
    Task,
}

#[derive(Debug, Error)]
pub enum RankError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("series with label:values {identity} already exists within group {group}")]
    DuplicateMember { identity: String, group: String },

    #[error("series {identity} has length {actual}, but {context} has length {expected}")]
    LengthMismatch {
        identity: String,
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Zero standard deviation; the sequence carries no correlation signal.
    #[error("standard deviation of zero")]
    DegenerateSeries,

    /// A scoring task panicked, was cancelled, or could not get a concurrency slot.
    #[error("scoring task failed: {message}")]
    Task { message: String },
}

impl From<tokio::task::JoinError> for RankError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task {
            message: err.to_string(),
        }
    }
}

impl From<tokio::sync::AcquireError> for RankError {
    fn from(err: tokio::sync::AcquireError) -> Self {
        Self::Task {
            message: err.to_string(),
        }
    }
}

impl RankError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RankError::InvalidInput { .. } => ErrorKind::InvalidInput,
            RankError::DuplicateMember { .. } => ErrorKind::DuplicateMember,
            RankError::LengthMismatch { .. } => ErrorKind::LengthMismatch,
            RankError::DegenerateSeries => ErrorKind::DegenerateSeries,
            RankError::Task { .. } => ErrorKind::Task,
        }
    }
}

pub type RankResult<T> = Result<T, RankError>;
