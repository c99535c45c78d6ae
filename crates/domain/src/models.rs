use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("Project ID cannot be empty.")]
    EmptyProject,
    #[error("Project ID contains invalid characters.")]
    InvalidProjectChars,
    #[error("Project ID is too long (max 64 chars).")]
    ProjectTooLong,
    #[error("Post ID cannot be empty.")]
    EmptyPost,
    #[error("Page size (take) must be positive.")]
    ZeroTake,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(s: impl Into<String>) -> Result<Self, TargetError> {
        let s = s.into();
        if s.is_empty() {
            return Err(TargetError::EmptyProject);
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
        {
            return Err(TargetError::InvalidProjectChars);
        }
        if s.len() > 64 {
            return Err(TargetError::ProjectTooLong);
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The project/post pair that scopes which comments belong together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentsTarget {
    pub project_id: ProjectId,
    pub post_id: String,
}

impl CommentsTarget {
    pub fn new(
        project_id: impl Into<String>,
        post_id: impl Into<String>,
    ) -> Result<Self, TargetError> {
        let project_id = ProjectId::new(project_id)?;
        let post_id = post_id.into();
        if post_id.trim().is_empty() {
            return Err(TargetError::EmptyPost);
        }
        Ok(Self {
            project_id,
            post_id,
        })
    }
}

/// Pagination for a list read. Absent fields are left out of the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take: Option<NonZeroU32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
}

impl PageParams {
    pub fn new(take: Option<u32>, skip: Option<u32>) -> Result<Self, TargetError> {
        let take = match take {
            Some(n) => Some(NonZeroU32::new(n).ok_or(TargetError::ZeroTake)?),
            None => None,
        };
        Ok(Self { take, skip })
    }
}

/// Correlation identifier attached to a locally created comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(Uuid);

impl LocalId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommentStatus {
    Sending,
    Added,
    DeliveredAwaitingApproval,
    Failed,
}

impl CommentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CommentStatus::Sending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub author: String,
    pub content: String,
    pub post_id: String,
    pub created_at: DateTime<Utc>,
    // 仅本地提交的评论携带状态，服务端列表中的评论不会有
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CommentStatus>,
    #[serde(skip)]
    pub local_id: Option<LocalId>,
    /// Correlation id of the submission that created this comment, when the
    /// server echoes it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txn_id: Option<LocalId>,
}

impl Comment {
    /// A locally originated comment that has not been confirmed yet.
    pub fn placeholder(
        local_id: LocalId,
        post_id: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            author: author.into(),
            content: content.into(),
            post_id: post_id.into(),
            created_at,
            status: Some(CommentStatus::Sending),
            local_id: Some(local_id),
            txn_id: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == Some(CommentStatus::Sending)
    }
}
