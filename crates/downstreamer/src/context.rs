use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Execution scope threaded explicitly through every dispatcher call.
///
/// Carries the org id of the caller (if any) and a [`CancellationToken`].
/// Cloning shares the same token; [`QueryContext::child`] derives a scope
/// that is cancelled whenever its parent is, without cancelling the parent.
#[derive(Clone, Debug, Default)]
pub struct QueryContext {
    org_id: Option<Arc<str>>,
    cancel: CancellationToken,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the raw org id. Several tenants are joined with `|`.
    #[must_use]
    pub fn with_org_id(mut self, org_id: impl Into<Arc<str>>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Uses `cancel` as this scope's token, e.g. one owned by a server's
    /// request handling.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn org_id(&self) -> Option<&str> {
        self.org_id.as_deref()
    }

    /// Derives a child scope sharing the org id.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            org_id: self.org_id.clone(),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once this scope is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
