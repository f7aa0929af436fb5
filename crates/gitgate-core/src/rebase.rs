//! Rebase controller.
//!
//! Plain rebases run as a one-step sequence. Interactive rebases are started
//! with a sequence editor that stops git before it touches anything, so the
//! todo script can be replaced with the caller's entries before continuing.

use std::sync::Arc;

use gitgate_git::GitClient;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{OperationError, Result};
use crate::markers::{self, RebaseProgress, TodoEntry};
use crate::sequence::SequentialOperation;
use crate::state::{END_OF_OPTIONS, OperationKind, OperationState};

/// Makes git write a single `break` line as the initial todo script.
const STOP_BEFORE_FIRST_PICK: &str = "sequence.editor=echo break >";

/// Drives `git rebase` and exposes the rebase markers on disk.
pub struct RebaseController<G> {
    op: SequentialOperation<G>,
}

impl<G: GitClient> RebaseController<G> {
    #[must_use]
    pub fn new(git: Arc<G>) -> Self {
        Self {
            op: SequentialOperation::new(OperationKind::Rebase, git),
        }
    }

    /// Rebase the current branch onto `onto`.
    ///
    /// # Errors
    /// Returns `Conflict` naming the stopped commit, or the git error.
    pub async fn rebase(&self, onto: &str) -> Result<OperationState> {
        self.op.start(vec![onto.to_string()]).await
    }

    /// Rebase onto `onto` using the given todo script.
    ///
    /// If git stops on an `edit` or `break` the state stays `InProgress`
    /// until [`edit_commit`](Self::edit_commit) or a continue finishes it.
    ///
    /// # Errors
    /// - `NoCommits` for an empty script
    /// - `InvalidRef` / `InvalidTodoEntry` for input git could misread
    /// - `AlreadyInProgress` while another rebase is running
    /// - `OtherOperationInProgress` while git is mid cherry-pick or revert
    /// - `Conflict` if a pick does not apply
    /// - the git or IO error otherwise
    pub async fn interactive_rebase(
        &self,
        onto: &str,
        entries: &[TodoEntry],
    ) -> Result<OperationState> {
        if entries.is_empty() {
            return Err(OperationError::NoCommits {
                kind: OperationKind::Rebase,
            });
        }

        let commits = vec![onto.to_string()];
        self.op.preflight(&commits)?;
        markers::validate_todo(entries)?;
        let previous = self.op.claim(commits.clone())?;
        info!(onto, entries = entries.len(), "starting interactive rebase");

        let start = vec![
            "-c".to_string(),
            STOP_BEFORE_FIRST_PICK.to_string(),
            "rebase".to_string(),
            "--interactive".to_string(),
            END_OF_OPTIONS.to_string(),
            onto.to_string(),
        ];
        if let Err(err) = self.op.git().raw(start).await {
            return Err(self.op.step_failed(err, &commits, 0, Some(previous)).await);
        }

        let Some(todo) = markers::todo_path(self.git_dir()) else {
            // Nothing to replay: git finished without stopping.
            self.op.finish();
            return Ok(self.op.state());
        };
        markers::write_todo(&todo, entries)?;
        debug!(path = %todo.display(), "todo script replaced");

        if let Err(err) = self.op.git().rebase(vec!["--continue".to_string()]).await {
            return Err(self.op.step_failed(err, &commits, 0, None).await);
        }
        Ok(self.settle())
    }

    /// Amend the commit a paused rebase stopped on, then continue.
    ///
    /// Only a sequence this controller started moves on afterwards; an idle
    /// controller stays idle.
    ///
    /// # Errors
    /// Returns the git error from either command, or `Conflict` if continuing
    /// stops again.
    pub async fn edit_commit(&self, message: &str) -> Result<OperationState> {
        let active = self.op.state().is_active();
        self.op
            .git()
            .commit(vec![
                "--amend".to_string(),
                "-m".to_string(),
                message.to_string(),
            ])
            .await?;

        let stopped = markers::stopped_commit(self.git_dir())?.unwrap_or_default();
        self.op.control("--continue", &stopped).await?;

        if !active || markers::is_rebasing(self.git_dir()) {
            return Ok(self.op.state());
        }
        self.op.resume().await
    }

    /// Progress read from the rebase state directory; `None` if no rebase.
    ///
    /// # Errors
    /// Returns error if a marker file cannot be read.
    pub fn progress(&self) -> Result<Option<RebaseProgress>> {
        Ok(markers::rebase_progress(self.git_dir())?)
    }

    /// Whether git has a rebase in flight, regardless of this controller.
    #[must_use]
    pub fn is_rebasing(&self) -> bool {
        markers::is_rebasing(self.git_dir())
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

    fn git_dir(&self) -> &std::path::Path {
        self.op.git().git_dir()
    }

    /// Complete unless git is still stopped on an `edit` or `break`.
    fn settle(&self) -> OperationState {
        if self.is_rebasing() {
            info!("rebase stopped for editing");
        } else {
            self.op.finish();
        }
        self.op.state()
    }
}
