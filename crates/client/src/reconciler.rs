use std::sync::Arc;

use chrono::{DateTime, Utc};
use domain::protocol::{CreateCommentRequest, ServerComment};
use domain::{Comment, CommentStatus, CommentsTarget, LocalId};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CommentsError, ErrorInfo};
use crate::store::CommentListStore;
use crate::transport::{CommentsTransport, TransportError};

/// What a settlement did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Applied(CommentStatus),
    /// The entity already left `sending`; nothing was changed.
    AlreadySettled(CommentStatus),
    /// No entity carries this id any more.
    Missing,
}

/// Builds the `sending` entity for one submission.
pub(crate) fn placeholder(
    target: &CommentsTarget,
    local_id: LocalId,
    author: &str,
    content: &str,
    created_at: DateTime<Utc>,
) -> Result<Comment, CommentsError> {
    if author.trim().is_empty() {
        return Err(CommentsError::InvalidInput("author must not be empty".into()));
    }
    if content.trim().is_empty() {
        return Err(CommentsError::InvalidInput("content must not be empty".into()));
    }
    Ok(Comment::placeholder(
        local_id,
        target.post_id.clone(),
        author,
        content,
        created_at,
    ))
}

/// Moves the entity tagged `local_id` out of `sending`. No other entity is
/// read or written.
pub(crate) fn reconcile(
    store: &mut CommentListStore,
    local_id: LocalId,
    outcome: Result<ServerComment, TransportError>,
) -> Reconciled {
    let Some(entity) = store.find_mut(local_id) else {
        return Reconciled::Missing;
    };
    if let Some(status) = entity.status.filter(|s| s.is_terminal()) {
        return Reconciled::AlreadySettled(status);
    }

    match outcome {
        Ok(ServerComment { mut comment, hidden }) => {
            let status = if hidden {
                CommentStatus::DeliveredAwaitingApproval
            } else {
                CommentStatus::Added
            };
            comment.status = Some(status);
            comment.local_id = Some(local_id);
            *entity = comment;
            Reconciled::Applied(status)
        }
        Err(e) => {
            entity.status = Some(CommentStatus::Failed);
            store.set_error(ErrorInfo::from(CommentsError::SubmissionFailed {
                details: e.to_string(),
            }));
            Reconciled::Applied(CommentStatus::Failed)
        }
    }
}

/// Optimistic insert plus write dispatch for one post.
#[derive(Clone)]
pub struct SubmissionReconciler {
    transport: Arc<dyn CommentsTransport>,
    state: Arc<watch::Sender<CommentListStore>>,
    target: CommentsTarget,
    cancel: CancellationToken,
}

impl SubmissionReconciler {
    pub(crate) fn new(
        transport: Arc<dyn CommentsTransport>,
        state: Arc<watch::Sender<CommentListStore>>,
        target: CommentsTarget,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            state,
            target,
            cancel,
        }
    }

    /// Prepends a `sending` placeholder before returning, then issues the
    /// write on a spawned task. Must be called inside a Tokio runtime.
    /// Fails with `ShutDown` once the accessor is torn down.
    pub fn submit(&self, author: &str, content: &str) -> Result<LocalId, CommentsError> {
        // 关闭后的占位评论永远无法结算
        if self.cancel.is_cancelled() {
            return Err(CommentsError::ShutDown);
        }
        let local_id = LocalId::generate();
        let entity = placeholder(&self.target, local_id, author, content, Utc::now())?;
        let request = CreateCommentRequest::new(&self.target, author, content, local_id);

        self.state.send_modify(|store| store.prepend(entity));
        info!(
            "Submitting comment {} to {}/{}",
            local_id, self.target.project_id, self.target.post_id
        );

        let transport = Arc::clone(&self.transport);
        let state = Arc::clone(&self.state);
        let cancel = self.cancel.clone();
        let project_id = self.target.project_id.clone();

        tokio::spawn(async move {
            let outcome = transport.create(&project_id, &request).await;
            settle(&state, &cancel, local_id, outcome);
        });

        Ok(local_id)
    }
}

fn settle(
    state: &watch::Sender<CommentListStore>,
    cancel: &CancellationToken,
    local_id: LocalId,
    outcome: Result<ServerComment, TransportError>,
) {
    if let Err(e) = &outcome {
        warn!("Comment {} failed to send: {}", local_id, e);
    }

    let mut result = None;
    state.send_if_modified(|store| {
        if cancel.is_cancelled() {
            return false;
        }
        let reconciled = reconcile(store, local_id, outcome);
        result = Some(reconciled);
        matches!(reconciled, Reconciled::Applied(_))
    });

    match result {
        None => debug!("Accessor shut down, dropping settlement for {}", local_id),
        Some(Reconciled::Applied(status)) => info!("Comment {} settled as {:?}", local_id, status),
        Some(Reconciled::AlreadySettled(status)) => {
            warn!("Comment {} already settled as {:?}", local_id, status)
        }
        Some(Reconciled::Missing) => warn!("Comment {} is no longer in the store", local_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn target() -> CommentsTarget {
        CommentsTarget::new("demo", "p1").unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn insert(store: &mut CommentListStore, author: &str, content: &str) -> LocalId {
        let id = LocalId::generate();
        store.prepend(placeholder(&target(), id, author, content, at()).unwrap());
        id
    }

    fn server(author: &str, content: &str, hidden: bool) -> ServerComment {
        ServerComment {
            comment: Comment {
                id: Some(format!("srv-{author}")),
                author: author.to_string(),
                content: content.to_string(),
                post_id: "p1".to_string(),
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 3).unwrap(),
                status: None,
                local_id: None,
                txn_id: None,
            },
            hidden,
        }
    }

    #[test]
    fn rejects_blank_author_or_content() {
        let id = LocalId::generate();
        assert!(matches!(
            placeholder(&target(), id, "", "hi", at()),
            Err(CommentsError::InvalidInput(_))
        ));
        assert!(matches!(
            placeholder(&target(), id, "alice", "   ", at()),
            Err(CommentsError::InvalidInput(_))
        ));
    }

    #[test]
    fn placeholder_starts_sending() {
        let id = LocalId::generate();
        let c = placeholder(&target(), id, "alice", "hi", at()).unwrap();
        assert_eq!(c.status, Some(CommentStatus::Sending));
        assert_eq!(c.local_id, Some(id));
        assert_eq!(c.post_id, "p1");
        assert_eq!(c.id, None);
    }

    #[test]
    fn visible_success_becomes_added() {
        let mut store = CommentListStore::default();
        let id = insert(&mut store, "alice", "hi");

        let outcome = reconcile(&mut store, id, Ok(server("alice", "hi", false)));

        assert_eq!(outcome, Reconciled::Applied(CommentStatus::Added));
        let c = store.find(id).unwrap();
        assert_eq!(c.status, Some(CommentStatus::Added));
        assert_eq!(c.id.as_deref(), Some("srv-alice"));
    }

    #[test]
    fn hidden_success_awaits_approval() {
        let mut store = CommentListStore::default();
        let id = insert(&mut store, "bob", "hello");

        reconcile(&mut store, id, Ok(server("bob", "hello", true)));

        assert_eq!(
            store.find(id).unwrap().status,
            Some(CommentStatus::DeliveredAwaitingApproval)
        );
    }

    #[test]
    fn failure_keeps_local_fields_and_count() {
        let mut store = CommentListStore::default();
        let id = insert(&mut store, "alice", "hi");

        let outcome = reconcile(
            &mut store,
            id,
            Err(TransportError::Network("Network Error".into())),
        );

        assert_eq!(outcome, Reconciled::Applied(CommentStatus::Failed));
        let c = store.find(id).unwrap();
        assert_eq!(c.status, Some(CommentStatus::Failed));
        assert_eq!(c.author, "alice");
        assert_eq!(c.content, "hi");
        assert_eq!(c.created_at, at());
        assert_eq!(store.count(), 1);
        let err = store.error().unwrap();
        assert_eq!(err.error, "Failed to add comment");
        assert_eq!(err.details, "Network Error");
    }

    #[test]
    fn terminal_entities_do_not_transition_again() {
        let mut store = CommentListStore::default();
        let id = insert(&mut store, "alice", "hi");
        reconcile(&mut store, id, Ok(server("alice", "hi", false)));

        let again = reconcile(
            &mut store,
            id,
            Err(TransportError::Network("late".into())),
        );

        assert_eq!(again, Reconciled::AlreadySettled(CommentStatus::Added));
        assert_eq!(store.find(id).unwrap().status, Some(CommentStatus::Added));
        assert!(store.error().is_none());
    }

    #[test]
    fn identical_submissions_are_reconciled_independently() {
        let mut store = CommentListStore::default();
        let first = insert(&mut store, "alice", "hi");
        let second = insert(&mut store, "alice", "hi");

        reconcile(&mut store, second, Ok(server("alice", "hi", false)));

        assert_eq!(store.find(first).unwrap().status, Some(CommentStatus::Sending));
        assert_eq!(store.find(second).unwrap().status, Some(CommentStatus::Added));

        reconcile(
            &mut store,
            first,
            Err(TransportError::Status {
                code: 503,
                reason: "Service Unavailable".into(),
            }),
        );

        assert_eq!(store.find(first).unwrap().status, Some(CommentStatus::Failed));
        assert_eq!(store.find(second).unwrap().status, Some(CommentStatus::Added));
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn unknown_id_is_missing() {
        let mut store = CommentListStore::default();
        insert(&mut store, "alice", "hi");

        let outcome = reconcile(
            &mut store,
            LocalId::generate(),
            Ok(server("alice", "hi", false)),
        );

        assert_eq!(outcome, Reconciled::Missing);
        assert!(store.comments()[0].is_pending());
    }
}
