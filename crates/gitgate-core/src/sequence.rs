//! Shared state machine behind the rebase, cherry-pick and revert controllers.
//!
//! ```text
//! Idle ──start──▶ InProgress ──step ok, none left──▶ Completed
//!                    │  ▲
//!         unmerged   │  │ continue/skip ok, refs left
//!                    ▼  │
//!                  Conflict ──continue/skip ok, none left──▶ Completed
//!
//! any ──abort──▶ Aborted
//! ```
//!
//! Transitions happen only in response to git's own results. A step that
//! fails without unmerged paths is reported unchanged, never as a conflict.
//! Unmerged paths only count as this operation's conflict while git's
//! markers say this kind of operation is in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gitgate_git::GitClient;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::conflict::ConflictDetector;
use crate::error::{OperationError, Result};
use crate::markers;
use crate::state::{OperationKind, OperationState};

/// Where a paused sequence stopped, kept so `continue`/`skip` can resume it.
#[derive(Debug, Clone)]
struct Paused {
    commits: Vec<String>,
    index: usize,
}

/// A sequence of single-ref git steps that may pause on conflict.
///
/// State is published through a watch channel: readers never wait behind a
/// running step, and every transition replaces the whole value.
pub struct SequentialOperation<G> {
    kind: OperationKind,
    git: Arc<G>,
    state: watch::Sender<OperationState>,
    paused: Mutex<Option<Paused>>,
}

impl<G: GitClient> SequentialOperation<G> {
    /// Create an idle operation of the given kind.
    #[must_use]
    pub fn new(kind: OperationKind, git: Arc<G>) -> Self {
        let (state, _) = watch::channel(OperationState::Idle);
        Self {
            kind,
            git,
            state,
            paused: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The git client this operation drives.
    #[must_use]
    pub fn git(&self) -> &G {
        &self.git
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> OperationState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OperationState> {
        self.state.subscribe()
    }

    /// Apply `commits` one at a time (newest first for revert).
    ///
    /// # Errors
    /// - `AlreadyInProgress` if a sequence is running or paused
    /// - `OtherOperationInProgress` if git is mid-way through another workflow
    /// - `NoCommits` for an empty list
    /// - `InvalidRef` for an empty or flag-shaped ref
    /// - `Conflict` when a step leaves unmerged paths
    /// - the raw git error for any other step failure
    pub async fn start(&self, mut commits: Vec<String>) -> Result<OperationState> {
        if commits.is_empty() {
            return Err(OperationError::NoCommits { kind: self.kind });
        }
        self.preflight(&commits)?;
        if self.kind.reverse_order() {
            commits.reverse();
        }

        let previous = self.claim(commits.clone())?;
        info!(kind = %self.kind, count = commits.len(), "starting sequence");
        self.run(commits, 0, Some(previous)).await
    }

    /// Run `<verb> --continue` after the caller resolved a conflict.
    ///
    /// # Errors
    /// - `NotInConflictState` unless the state is `Conflict`
    /// - `Conflict` with refreshed files if git stops again
    /// - the raw git error otherwise, leaving the state untouched
    pub async fn continue_operation(&self) -> Result<OperationState> {
        let OperationState::Conflict { commit, .. } = self.state() else {
            return Err(OperationError::NotInConflictState { kind: self.kind });
        };

        self.control("--continue", &commit).await?;
        self.resume().await
    }

    /// Run `<verb> --skip`, dropping the current ref's changes.
    ///
    /// From `Conflict` the remaining refs are applied afterwards; in any other
    /// state only the git command runs.
    ///
    /// # Errors
    /// Returns `Conflict` if git stops again, or the raw git error.
    pub async fn skip(&self) -> Result<OperationState> {
        let current = self.state();
        let commit = match &current {
            OperationState::Conflict { commit, .. } => commit.clone(),
            OperationState::InProgress { commits, current } => {
                commits.get(*current).cloned().unwrap_or_default()
            }
            _ => String::new(),
        };

        self.control("--skip", &commit).await?;
        if current.is_conflict() {
            self.resume().await
        } else {
            Ok(self.state())
        }
    }

    /// Run `<verb> --abort` and move to `Aborted`, whatever the current state.
    ///
    /// A sequence still applying refs stops before its next step.
    ///
    /// # Errors
    /// Returns the git error if the abort command failed; the state is
    /// `Aborted` either way.
    pub async fn abort(&self) -> Result<OperationState> {
        let result = self.git_command(vec!["--abort".to_string()]).await;
        *self.paused() = None;
        self.set(OperationState::Aborted);

        match result {
            Ok(_) => {
                info!(kind = %self.kind, "aborted");
                Ok(OperationState::Aborted)
            }
            Err(err) => {
                warn!(kind = %self.kind, error = %err, "abort command failed");
                Err(err.into())
            }
        }
    }

    /// Reject refs git could read as options, and starts while git has a
    /// different workflow in flight.
    pub(crate) fn preflight(&self, refs: &[String]) -> Result<()> {
        if let Some(bad) = refs.iter().find(|r| r.is_empty() || r.starts_with('-')) {
            return Err(OperationError::InvalidRef(bad.clone()));
        }

        match markers::in_progress(self.git.git_dir()) {
            Some(active) if active != self.kind => {
                warn!(kind = %self.kind, active = %active, "another operation is in progress");
                Err(OperationError::OtherOperationInProgress {
                    kind: self.kind,
                    active,
                })
            }
            _ => Ok(()),
        }
    }

    /// Move to `InProgress` unless a sequence is already active.
    ///
    /// Returns the state that was replaced.
    pub(crate) fn claim(&self, commits: Vec<String>) -> Result<OperationState> {
        let mut previous = None;
        self.state.send_if_modified(|state| {
            if state.is_active() {
                return false;
            }
            let next = OperationState::InProgress {
                commits,
                current: 0,
            };
            previous = Some(std::mem::replace(state, next));
            true
        });

        let previous = previous.ok_or(OperationError::AlreadyInProgress { kind: self.kind })?;
        *self.paused() = None;
        Ok(previous)
    }

    /// `InProgress` becomes `Completed`; anything else is left alone.
    pub(crate) fn finish(&self) {
        if self.set_if(
            |s| matches!(s, OperationState::InProgress { .. }),
            OperationState::Completed,
        ) {
            info!(kind = %self.kind, "completed");
        }
    }

    async fn run(
        &self,
        commits: Vec<String>,
        from: usize,
        mut restore: Option<OperationState>,
    ) -> Result<OperationState> {
        for index in from..commits.len() {
            let advanced = self.set_if(
                |s| matches!(s, OperationState::InProgress { .. }),
                OperationState::InProgress {
                    commits: commits.clone(),
                    current: index,
                },
            );
            if !advanced {
                info!(kind = %self.kind, commit = %commits[index], "sequence stopped before step");
                return Ok(self.state());
            }

            let commit = &commits[index];
            if let Err(err) = self.git_command(self.kind.step_args(commit)).await {
                let restore = if index == from { restore.take() } else { None };
                return Err(self.step_failed(err, &commits, index, restore).await);
            }
            debug!(kind = %self.kind, commit = %commit, "step applied");
        }

        self.finish();
        Ok(self.state())
    }

    /// Classify a failed step as a conflict or a plain git failure.
    ///
    /// `restore` is the pre-start state, used when nothing was applied yet.
    pub(crate) async fn step_failed(
        &self,
        err: gitgate_git::Error,
        commits: &[String],
        index: usize,
        restore: Option<OperationState>,
    ) -> OperationError {
        let Some(files) = self.conflicts().await else {
            warn!(kind = %self.kind, commit = %commits[index], error = %err, "step failed");
            if let Some(previous) = restore {
                self.set_if(|s| matches!(s, OperationState::InProgress { .. }), previous);
            }
            return err.into();
        };

        let commit = self.blocking_commit(&commits[index]);
        *self.paused() = Some(Paused {
            commits: commits.to_vec(),
            index,
        });
        self.set_if(
            |s| matches!(s, OperationState::InProgress { .. }),
            OperationState::Conflict {
                commit: commit.clone(),
                files: files.clone(),
            },
        );
        warn!(kind = %self.kind, commit = %commit, files = files.len(), "paused on conflict");

        OperationError::Conflict {
            kind: self.kind,
            commit,
            files,
        }
    }

    /// Run `<verb> <flag>`; if git stops with unmerged paths, record the conflict.
    pub(crate) async fn control(&self, flag: &str, commit: &str) -> Result<()> {
        let Err(err) = self.git_command(vec![flag.to_string()]).await else {
            return Ok(());
        };

        let Some(files) = self.conflicts().await else {
            warn!(kind = %self.kind, flag, error = %err, "git failed");
            return Err(err.into());
        };

        let commit = self.blocking_commit(commit);
        self.set_if(
            |s| !matches!(s, OperationState::Aborted),
            OperationState::Conflict {
                commit: commit.clone(),
                files: files.clone(),
            },
        );
        warn!(kind = %self.kind, flag, commit = %commit, "still conflicted");

        Err(OperationError::Conflict {
            kind: self.kind,
            commit,
            files,
        })
    }

    /// Apply whatever refs were left when the sequence paused.
    pub(crate) async fn resume(&self) -> Result<OperationState> {
        let paused = self.paused().take();
        let Some(Paused { commits, index }) = paused.filter(|p| p.index + 1 < p.commits.len())
        else {
            self.set_if(
                |s| !matches!(s, OperationState::Aborted),
                OperationState::Completed,
            );
            info!(kind = %self.kind, "completed");
            return Ok(self.state());
        };

        let next = index + 1;
        let resumed = self.set_if(
            OperationState::is_conflict,
            OperationState::InProgress {
                commits: commits.clone(),
                current: next,
            },
        );
        if !resumed {
            return Ok(self.state());
        }

        info!(kind = %self.kind, remaining = commits.len() - next, "resuming sequence");
        self.run(commits, next, None).await
    }

    async fn git_command(&self, args: Vec<String>) -> gitgate_git::Result<String> {
        match self.kind {
            OperationKind::Rebase => self.git.rebase(args).await,
            OperationKind::CherryPick => self.git.cherry_pick(args).await,
            OperationKind::Revert => self.git.revert(args).await,
        }
    }

    /// Unmerged paths left by this kind of operation.
    ///
    /// Paths left by another workflow, or with no operation in flight at all,
    /// are not ours to report. A failed status query counts as none.
    async fn conflicts(&self) -> Option<Vec<String>> {
        let active = markers::in_progress(self.git.git_dir());
        if active != Some(self.kind) {
            debug!(kind = %self.kind, active = ?active, "failure is not this operation's conflict");
            return None;
        }

        match ConflictDetector::detect(self.git.as_ref()).await {
            Ok(files) => files,
            Err(err) => {
                warn!(kind = %self.kind, error = %err, "could not inspect repository status");
                None
            }
        }
    }

    /// The commit git is actually stuck on.
    ///
    /// A rebase replays many commits per step, so `REBASE_HEAD` names the
    /// blocking one more precisely than the ref the step was given.
    fn blocking_commit(&self, fallback: &str) -> String {
        if self.kind == OperationKind::Rebase {
            if let Ok(Some(stopped)) = markers::stopped_commit(self.git.git_dir()) {
                return stopped;
            }
        }
        fallback.to_string()
    }

    fn set(&self, next: OperationState) {
        debug!(kind = %self.kind, state = ?next, "transition");
        self.state.send_replace(next);
    }

    /// Replace the state only while `current` holds; atomic with respect to
    /// other transitions.
    fn set_if(&self, current: impl FnOnce(&OperationState) -> bool, next: OperationState) -> bool {
        let kind = self.kind;
        self.state.send_if_modified(|state| {
            if !current(state) {
                return false;
            }
            debug!(kind = %kind, state = ?next, "transition");
            *state = next;
            true
        })
    }

    fn paused(&self) -> MutexGuard<'_, Option<Paused>> {
        self.paused.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
