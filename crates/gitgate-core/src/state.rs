//! Operation state model shared by every sequential controller.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marks the end of flags on a git command line.
pub(crate) const END_OF_OPTIONS: &str = "--end-of-options";

/// Which git workflow a controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    /// `git rebase`.
    Rebase,
    /// `git cherry-pick`.
    CherryPick,
    /// `git revert`.
    Revert,
}

impl OperationKind {
    /// The git subcommand for this workflow.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Rebase => "rebase",
            Self::CherryPick => "cherry-pick",
            Self::Revert => "revert",
        }
    }

    /// Whether refs are applied newest first.
    ///
    /// Reverting in reverse keeps a later commit's changes from conflicting
    /// against a tree where the earlier commit it builds on is already gone.
    #[must_use]
    pub const fn reverse_order(self) -> bool {
        matches!(self, Self::Revert)
    }

    /// Arguments (after the subcommand) that apply a single ref.
    ///
    /// The ref always follows `--end-of-options`, so git never reads it as a flag.
    #[must_use]
    pub fn step_args(self, commit: &str) -> Vec<String> {
        let mut args = match self {
            Self::Rebase | Self::CherryPick => Vec::new(),
            Self::Revert => vec!["--no-edit".to_string()],
        };
        args.push(END_OF_OPTIONS.to_string());
        args.push(commit.to_string());
        args
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// State of a sequential operation.
///
/// Replaced wholesale on every transition; never partially mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OperationState {
    /// Nothing has run yet.
    #[default]
    Idle,

    /// Refs are being applied in order.
    InProgress {
        /// Refs in execution order.
        commits: Vec<String>,
        /// Index of the ref being applied.
        current: usize,
    },

    /// Git stopped with unmerged paths.
    Conflict {
        /// The ref that could not be applied.
        commit: String,
        /// Unmerged paths blocking progress.
        files: Vec<String>,
    },

    /// Every ref was applied.
    Completed,

    /// The operation was cancelled.
    Aborted,
}

impl OperationState {
    /// Whether an operation is running or paused.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::InProgress { .. } | Self::Conflict { .. })
    }

    /// Whether the operation has reached `Completed` or `Aborted`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conflict_serializes_with_type_tag() {
        let state = OperationState::Conflict {
            commit: "b".into(),
            files: vec!["f.txt".into()],
        };

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"type": "conflict", "commit": "b", "files": ["f.txt"]})
        );
    }

    #[test]
    fn test_in_progress_tag_is_camel_case() {
        let state = OperationState::InProgress {
            commits: vec!["a".into()],
            current: 0,
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["type"], "inProgress");
        assert_eq!(value["current"], 0);
    }

    #[test]
    fn test_unit_states_serialize_as_tag_only() {
        assert_eq!(
            serde_json::to_value(OperationState::Idle).unwrap(),
            json!({"type": "idle"})
        );
        assert_eq!(
            serde_json::to_value(OperationState::Aborted).unwrap(),
            json!({"type": "aborted"})
        );
    }

    #[test]
    fn test_active_and_terminal() {
        assert!(!OperationState::Idle.is_active());
        assert!(
            OperationState::Conflict {
                commit: "x".into(),
                files: vec![]
            }
            .is_active()
        );
        assert!(OperationState::Completed.is_terminal());
        assert!(!OperationState::Idle.is_terminal());
    }

    #[test]
    fn test_only_revert_reverses() {
        assert!(OperationKind::Revert.reverse_order());
        assert!(!OperationKind::CherryPick.reverse_order());
        assert!(!OperationKind::Rebase.reverse_order());
    }

    #[test]
    fn test_step_args() {
        assert_eq!(
            OperationKind::CherryPick.step_args("abc"),
            vec!["--end-of-options", "abc"]
        );
        assert_eq!(
            OperationKind::Revert.step_args("abc"),
            vec!["--no-edit", "--end-of-options", "abc"]
        );
        // A flag-shaped ref stays a positional argument.
        assert_eq!(
            OperationKind::Rebase.step_args("--exec=true"),
            vec!["--end-of-options", "--exec=true"]
        );
        assert_eq!(OperationKind::CherryPick.to_string(), "cherry-pick");
    }
}
