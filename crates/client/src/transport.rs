use async_trait::async_trait;
use domain::protocol::{
    CreateCommentRequest, ListCommentsQuery, ListCommentsResponse, ServerComment,
};
use domain::ProjectId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Non-success response. Displays as the status text.
    #[error("{reason}")]
    Status { code: u16, reason: String },
    #[error("{0}")]
    Network(String),
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// The read/write calls the accessor needs from the comments backend.
#[async_trait]
pub trait CommentsTransport: Send + Sync {
    async fn list(&self, query: &ListCommentsQuery) -> Result<ListCommentsResponse, TransportError>;

    async fn create(
        &self,
        project_id: &ProjectId,
        request: &CreateCommentRequest,
    ) -> Result<ServerComment, TransportError>;
}
