mod error;
pub mod http;
mod reconciler;
mod store;
mod transport;

pub use error::{CommentsError, ErrorInfo};
pub use http::HttpTransport;
pub use reconciler::{Reconciled, SubmissionReconciler};
pub use store::{CommentListStore, LoadTicket};
pub use transport::{CommentsTransport, TransportError};

use std::sync::Arc;

use domain::protocol::ListCommentsQuery;
use domain::{Comment, CommentsTarget, LocalId, PageParams};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Stateful accessor for the comments of one post.
///
/// All store mutations go through the watch channel, so they are applied one
/// at a time and every subscriber sees each change. Reads and writes run on
/// spawned tasks; their settlements are dropped once the accessor is shut
/// down or its last handle is gone.
#[derive(Clone)]
pub struct CommentsAccessor {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn CommentsTransport>,
    state: Arc<watch::Sender<CommentListStore>>,
    target: CommentsTarget,
    reconciler: SubmissionReconciler,
    cancel: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl CommentsAccessor {
    /// Mounts the accessor and issues the first load. Must be called inside a
    /// Tokio runtime.
    pub fn new(
        transport: Arc<dyn CommentsTransport>,
        target: CommentsTarget,
        page: PageParams,
    ) -> Self {
        let (tx, _rx) = watch::channel(CommentListStore::new(page));
        let state = Arc::new(tx);
        let cancel = CancellationToken::new();
        let reconciler = SubmissionReconciler::new(
            Arc::clone(&transport),
            Arc::clone(&state),
            target.clone(),
            cancel.clone(),
        );

        let accessor = Self {
            inner: Arc::new(Inner {
                transport,
                state,
                target,
                reconciler,
                cancel,
            }),
        };
        accessor.load();
        accessor
    }

    pub fn target(&self) -> &CommentsTarget {
        &self.inner.target
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.inner.state.borrow().comments().to_vec()
    }

    pub fn count(&self) -> u64 {
        self.inner.state.borrow().count()
    }

    pub fn loading(&self) -> bool {
        self.inner.state.borrow().loading()
    }

    pub fn error(&self) -> Option<ErrorInfo> {
        self.inner.state.borrow().error().cloned()
    }

    pub fn page(&self) -> PageParams {
        self.inner.state.borrow().page()
    }

    /// Current entity for a submission, if it is still in the store.
    pub fn find(&self, local_id: LocalId) -> Option<Comment> {
        self.inner.state.borrow().find(local_id).cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<CommentListStore> {
        self.inner.state.subscribe()
    }

    pub fn updates(&self) -> WatchStream<CommentListStore> {
        WatchStream::new(self.subscribe())
    }

    /// Re-issues the read with the current page parameters. No-op after
    /// `shutdown`.
    pub fn refetch(&self) {
        self.load();
    }

    /// Switches pagination. A load is issued only if `take` or `skip`
    /// changed; returns whether one was.
    pub fn set_page(&self, page: PageParams) -> bool {
        let changed = self.inner.state.send_if_modified(|store| store.set_page(page));
        if changed {
            self.load();
        }
        changed
    }

    /// Inserts a `sending` comment immediately and submits it in the
    /// background. The returned id tracks that one entity.
    pub fn add_comment(&self, author: &str, content: &str) -> Result<LocalId, CommentsError> {
        self.inner.reconciler.submit(author, content)
    }

    /// Stops applying settlements. Requests already in flight are left to
    /// finish on their own.
    pub fn shutdown(&self) {
        if !self.inner.cancel.is_cancelled() {
            info!(
                "Shutting down comments accessor for {}/{}",
                self.inner.target.project_id, self.inner.target.post_id
            );
        }
        self.inner.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    fn load(&self) {
        if self.inner.cancel.is_cancelled() {
            debug!(
                "Ignoring load for {}/{} after shutdown",
                self.inner.target.project_id, self.inner.target.post_id
            );
            return;
        }
        let mut issued = None;
        self.inner
            .state
            .send_modify(|store| issued = Some((store.begin_load(), store.page())));
        let Some((ticket, page)) = issued else {
            return;
        };

        let query = ListCommentsQuery::new(&self.inner.target, page);
        info!(
            "Loading comments for {}/{} (take={:?}, skip={:?})",
            query.project_id, query.post_id, page.take, page.skip
        );

        let transport = Arc::clone(&self.inner.transport);
        let state = Arc::clone(&self.inner.state);
        let cancel = self.inner.cancel.clone();

        tokio::spawn(async move {
            let result = transport.list(&query).await.map_err(|e| {
                warn!("Loading comments failed: {}", e);
                CommentsError::FetchFailed {
                    details: e.to_string(),
                }
            });

            let mut applied = false;
            state.send_if_modified(|store| {
                if cancel.is_cancelled() {
                    return false;
                }
                applied = store.finish_load(ticket, result);
                applied
            });

            if !applied {
                debug!("Discarded stale or late load result for {:?}", ticket);
            }
        });
    }
}
