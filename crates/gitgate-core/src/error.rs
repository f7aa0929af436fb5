//! Error types for gitgate-core.

use crate::state::OperationKind;

/// Result type alias using [`OperationError`].
pub type Result<T> = std::result::Result<T, OperationError>;

/// Errors returned by the sequential operation controllers.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// Git stopped with unmerged paths; resolve them and continue, or skip/abort.
    #[error("{kind} conflict while applying {commit} in: {}", .files.join(", "))]
    Conflict {
        /// The workflow that stopped.
        kind: OperationKind,
        /// The ref that could not be applied.
        commit: String,
        /// Unmerged paths.
        files: Vec<String>,
    },

    /// `continue` was called with no pending conflict.
    #[error("no {kind} conflict to continue")]
    NotInConflictState { kind: OperationKind },

    /// A sequence is already running or paused on this controller.
    #[error("a {kind} is already in progress - continue, skip or abort it first")]
    AlreadyInProgress { kind: OperationKind },

    /// Git has a different sequential operation in flight in this repository.
    #[error("cannot start {kind}: a {active} is already in progress in this repository")]
    OtherOperationInProgress {
        kind: OperationKind,
        active: OperationKind,
    },

    /// Nothing to apply.
    #[error("no commits given to {kind}")]
    NoCommits { kind: OperationKind },

    /// A ref that git would parse as an option, or no ref at all.
    #[error("invalid ref '{0}' - refs must be non-empty and may not start with '-'")]
    InvalidRef(String),

    /// A todo entry that would not fit on one line of the rebase script.
    #[error("todo entry {index}: {reason}")]
    InvalidTodoEntry { index: usize, reason: &'static str },

    /// Unknown interactive rebase action.
    #[error("invalid rebase action '{0}' - expected pick, reword, edit, squash, fixup or drop")]
    InvalidAction(String),

    /// IO error reading or writing rebase state files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying git failure that was not a merge conflict.
    #[error(transparent)]
    Git(#[from] gitgate_git::Error),
}

impl OperationError {
    /// Unmerged paths, if this error is a conflict.
    #[must_use]
    pub fn conflict_files(&self) -> Option<&[String]> {
        match self {
            Self::Conflict { files, .. } => Some(files),
            _ => None,
        }
    }
}
