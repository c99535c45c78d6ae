use crate::models::{Comment, CommentsTarget, LocalId, PageParams, ProjectId};
use serde::{Deserialize, Serialize};

/// Parameters of a list read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCommentsQuery {
    pub project_id: ProjectId,
    pub post_id: String,
    pub page: PageParams,
}

impl ListCommentsQuery {
    pub fn new(target: &CommentsTarget, page: PageParams) -> Self {
        Self {
            project_id: target.project_id.clone(),
            post_id: target.post_id.clone(),
            page,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCommentsResponse {
    pub comments: Vec<Comment>,
    pub count: u64,
}

/// Body of a create call. The project travels in the URL path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: String,
    pub author: String,
    pub content: String,
    // 幂等去重键
    pub txn_id: LocalId,
}

impl CreateCommentRequest {
    pub fn new(
        target: &CommentsTarget,
        author: impl Into<String>,
        content: impl Into<String>,
        txn_id: LocalId,
    ) -> Self {
        Self {
            post_id: target.post_id.clone(),
            author: author.into(),
            content: content.into(),
            txn_id,
        }
    }
}

/// The canonical record returned by a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerComment {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCommentResponse {
    pub comment: ServerComment,
}
