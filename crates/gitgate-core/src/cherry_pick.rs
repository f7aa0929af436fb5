//! Cherry-pick controller.

use std::sync::Arc;

use gitgate_git::GitClient;
use tokio::sync::watch;

use crate::error::Result;
use crate::sequence::SequentialOperation;
use crate::state::{OperationKind, OperationState};

/// Applies commits onto the current branch one at a time.
pub struct CherryPickController<G> {
    op: SequentialOperation<G>,
}

impl<G: GitClient> CherryPickController<G> {
    #[must_use]
    pub fn new(git: Arc<G>) -> Self {
        Self {
            op: SequentialOperation::new(OperationKind::CherryPick, git),
        }
    }

    /// Cherry-pick `commits` in the order given.
    ///
    /// # Errors
    /// Returns `Conflict` when a commit does not apply cleanly, or the git
    /// error for anything else.
    pub async fn cherry_pick(&self, commits: Vec<String>) -> Result<OperationState> {
        self.op.start(commits).await
    }

    /// # Errors
    /// See [`SequentialOperation::continue_operation`].
    pub async fn continue_operation(&self) -> Result<OperationState> {
        self.op.continue_operation().await
    }

    /// # Errors
    /// See [`SequentialOperation::abort`].
    pub async fn abort(&self) -> Result<OperationState> {
        self.op.abort().await
    }

    /// # Errors
    /// See [`SequentialOperation::skip`].
    pub async fn skip(&self) -> Result<OperationState> {
        self.op.skip().await
    }

    #[must_use]
    pub fn state(&self) -> OperationState {
        self.op.state()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OperationState> {
        self.op.subscribe()
    }
}
