//! # gitgate-core
//!
//! Conflict-aware controllers for git's sequential operations.
//!
//! Rebase, cherry-pick and revert all apply a list of refs one step at a
//! time, may stop with unmerged paths, and resume through
//! `--continue`/`--skip`/`--abort`. [`SequentialOperation`] implements that
//! state machine once; the controllers wrap it with their own entry points.

pub mod cherry_pick;
pub mod conflict;
pub mod error;
pub mod markers;
pub mod rebase;
pub mod revert;
pub mod sequence;
pub mod state;

pub use cherry_pick::CherryPickController;
pub use conflict::ConflictDetector;
pub use error::{OperationError, Result};
pub use markers::{RebaseAction, RebaseBackend, RebaseProgress, TodoEntry};
pub use rebase::RebaseController;
pub use revert::RevertController;
pub use sequence::SequentialOperation;
pub use state::{OperationKind, OperationState};
