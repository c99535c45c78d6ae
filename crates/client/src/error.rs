use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentsError {
    #[error("Failed to load comments")]
    FetchFailed { details: String },
    #[error("Failed to add comment")]
    SubmissionFailed { details: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Comments accessor has been shut down")]
    ShutDown,
}

impl CommentsError {
    pub fn details(&self) -> &str {
        match self {
            CommentsError::FetchFailed { details } | CommentsError::SubmissionFailed { details } => {
                details
            }
            CommentsError::InvalidInput(reason) => reason,
            CommentsError::ShutDown => "",
        }
    }
}

/// The structured error surfaced to callers through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub error: String,
    pub details: String,
}

impl From<&CommentsError> for ErrorInfo {
    fn from(err: &CommentsError) -> Self {
        Self {
            error: err.to_string(),
            details: err.details().to_string(),
        }
    }
}

impl From<CommentsError> for ErrorInfo {
    fn from(err: CommentsError) -> Self {
        Self::from(&err)
    }
}
