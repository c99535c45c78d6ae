use domain::protocol::ListCommentsResponse;
use domain::{Comment, LocalId, PageParams};

use crate::error::{CommentsError, ErrorInfo};

/// Identifies one issued load. Only the ticket of the most recent load may
/// settle into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Ordered in-memory comments for one post, newest optimistic entries first.
#[derive(Debug, Clone, Default)]
pub struct CommentListStore {
    comments: Vec<Comment>,
    count: u64,
    loading: bool,
    error: Option<ErrorInfo>,
    page: PageParams,
    generation: u64,
}

impl CommentListStore {
    pub fn new(page: PageParams) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn page(&self) -> PageParams {
        self.page
    }

    pub fn find(&self, local_id: LocalId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.local_id == Some(local_id))
    }

    pub(crate) fn find_mut(&mut self, local_id: LocalId) -> Option<&mut Comment> {
        self.comments
            .iter_mut()
            .find(|c| c.local_id == Some(local_id))
    }

    /// Returns `true` when the parameters actually changed.
    pub(crate) fn set_page(&mut self, page: PageParams) -> bool {
        if self.page == page {
            return false;
        }
        self.page = page;
        true
    }

    pub(crate) fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.loading = true;
        LoadTicket(self.generation)
    }

    /// Applies a settled load. Returns `false` (and changes nothing) when a
    /// newer load has been issued since `ticket`.
    pub(crate) fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<ListCommentsResponse, CommentsError>,
    ) -> bool {
        if ticket.0 != self.generation {
            return false;
        }
        self.loading = false;
        match result {
            Ok(response) => {
                self.replace(response);
                self.error = None;
            }
            Err(e) => self.error = Some(ErrorInfo::from(e)),
        }
        true
    }

    // Entries still waiting on their write survive the replacement. A fetched
    // comment echoing a pending entry's txn id takes over that entry, so the
    // write is neither shown nor counted twice.
    fn replace(&mut self, response: ListCommentsResponse) {
        let mut merged: Vec<Comment> = self
            .comments
            .drain(..)
            .filter(Comment::is_pending)
            .collect();
        let mut fetched = response.comments;
        for comment in &mut fetched {
            let Some(txn_id) = comment.txn_id else {
                continue;
            };
            if let Some(pos) = merged.iter().position(|p| p.local_id == Some(txn_id)) {
                let local = merged.remove(pos);
                comment.local_id = local.local_id;
                comment.status = local.status;
            }
        }
        let pending = merged.len() as u64;
        merged.extend(fetched);
        self.comments = merged;
        self.count = response.count + pending;
    }

    pub(crate) fn prepend(&mut self, comment: Comment) {
        self.comments.insert(0, comment);
        self.count += 1;
    }

    pub(crate) fn set_error(&mut self, error: ErrorInfo) {
        self.error = Some(error);
    }
}
