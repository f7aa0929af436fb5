//! Repository status snapshot.

use git2::Status;
use serde::{Deserialize, Serialize};

/// Paths grouped by their state in the index and working tree.
///
/// A path can appear in several groups (staged and modified, for instance),
/// except `conflicted`, which git reports on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStatus {
    /// Unmerged paths left behind by a failed merge, rebase, cherry-pick or revert.
    pub conflicted: Vec<String>,
    /// Paths with changes in the index.
    pub staged: Vec<String>,
    /// Tracked paths with unstaged changes.
    pub modified: Vec<String>,
    /// Paths git does not track yet.
    pub untracked: Vec<String>,
}

impl RepoStatus {
    /// Whether any path is unmerged.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicted.is_empty()
    }

    /// Whether nothing at all is pending.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicted.is_empty()
            && self.staged.is_empty()
            && self.modified.is_empty()
            && self.untracked.is_empty()
    }

    /// Sort a path into its groups.
    pub(crate) fn record(&mut self, path: String, status: Status) {
        if status.is_conflicted() {
            self.conflicted.push(path);
            return;
        }

        if status.intersects(
            Status::INDEX_NEW
                | Status::INDEX_MODIFIED
                | Status::INDEX_DELETED
                | Status::INDEX_RENAMED
                | Status::INDEX_TYPECHANGE,
        ) {
            self.staged.push(path.clone());
        }

        if status.intersects(
            Status::WT_MODIFIED | Status::WT_DELETED | Status::WT_RENAMED | Status::WT_TYPECHANGE,
        ) {
            self.modified.push(path.clone());
        }

        if status.contains(Status::WT_NEW) {
            self.untracked.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicted_path_is_exclusive() {
        let mut status = RepoStatus::default();
        status.record("a.txt".into(), Status::CONFLICTED | Status::INDEX_MODIFIED);

        assert_eq!(status.conflicted, vec!["a.txt"]);
        assert!(status.staged.is_empty());
        assert!(status.has_conflicts());
    }

    #[test]
    fn test_path_can_be_staged_and_modified() {
        let mut status = RepoStatus::default();
        status.record("b.rs".into(), Status::INDEX_MODIFIED | Status::WT_MODIFIED);

        assert_eq!(status.staged, vec!["b.rs"]);
        assert_eq!(status.modified, vec!["b.rs"]);
        assert!(!status.is_clean());
    }

    #[test]
    fn test_untracked() {
        let mut status = RepoStatus::default();
        status.record("new.txt".into(), Status::WT_NEW);

        assert_eq!(status.untracked, vec!["new.txt"]);
        assert!(!status.has_conflicts());
    }

    #[test]
    fn test_default_is_clean() {
        assert!(RepoStatus::default().is_clean());
    }

    #[test]
    fn test_serializes_all_groups() {
        let mut status = RepoStatus::default();
        status.record("x".into(), Status::CONFLICTED);

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["conflicted"], serde_json::json!(["x"]));
        assert_eq!(value["untracked"], serde_json::json!([]));
    }
}
