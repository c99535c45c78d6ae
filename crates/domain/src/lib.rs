mod models;
pub mod protocol;

pub use models::{
    Comment, CommentStatus, CommentsTarget, LocalId, PageParams, ProjectId, TargetError,
};
