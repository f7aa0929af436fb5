//! Revert controller.

use std::sync::Arc;

use gitgate_git::GitClient;
use tokio::sync::watch;

use crate::error::Result;
use crate::sequence::SequentialOperation;
use crate::state::{OperationKind, OperationState};

/// Reverts commits newest first, one revert commit per ref.
pub struct RevertController<G> {
    op: SequentialOperation<G>,
}

impl<G: GitClient> RevertController<G> {
    #[must_use]
    pub fn new(git: Arc<G>) -> Self {
        Self {
            op: SequentialOperation::new(OperationKind::Revert, git),
        }
    }

    /// Revert `commits`; the list is applied in reverse.
    ///
    /// # Errors
    /// Returns `Conflict` when a revert does not apply cleanly, or the git
    /// error for anything else.
    pub async fn revert(&self, commits: Vec<String>) -> Result<OperationState> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperationError;
    use gitgate_git::testing::MockGit;

    fn refs(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_reverts_in_reverse_order() {
        let git = Arc::new(MockGit::new());
        let controller = RevertController::new(Arc::clone(&git));

        let state = controller.revert(refs(&["c1", "c2", "c3"])).await.unwrap();

        assert_eq!(state, OperationState::Completed);
        assert_eq!(
            git.call_lines(),
            vec![
                "revert --no-edit --end-of-options c3",
                "revert --no-edit --end-of-options c2",
                "revert --no-edit --end-of-options c1"
            ]
        );
    }

    #[tokio::test]
    async fn test_conflict_then_skip() {
        let git = Arc::new(MockGit::new().with_conflict(&["revert", "--no-edit", "--end-of-options", "c2"], &["lib.rs"]));
        let controller = RevertController::new(Arc::clone(&git));

        let err = controller.revert(refs(&["c1", "c2"])).await.unwrap_err();
        assert_eq!(err.conflict_files().unwrap(), ["lib.rs"]);

        assert_eq!(controller.skip().await.unwrap(), OperationState::Completed);
        assert_eq!(
            git.call_lines(),
            vec!["revert --no-edit --end-of-options c2", "revert --skip", "revert --no-edit --end-of-options c1"]
        );
    }

    #[tokio::test]
    async fn test_bad_ref_is_not_a_conflict() {
        let git = Arc::new(
            MockGit::new().with_failure(&["revert", "--no-edit", "--end-of-options", "zzz"], "fatal: bad revision 'zzz'"),
        );
        let controller = RevertController::new(git);

        let err = controller.revert(refs(&["zzz"])).await.unwrap_err();
        assert!(matches!(err, OperationError::Git(_)));
        assert_eq!(controller.state(), OperationState::Idle);
    }

    #[tokio::test]
    async fn test_subscribe_sees_abort() {
        let controller = RevertController::new(Arc::new(MockGit::new()));
        let mut rx = controller.subscribe();

        controller.abort().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), OperationState::Aborted);
    }
}
