//! Conflict detection shared by all controllers.

use gitgate_git::{GitClient, Result};

/// Reads unmerged paths from the repository status.
pub struct ConflictDetector;

impl ConflictDetector {
    /// Unmerged paths currently in the repository, or `None` when there are none.
    ///
    /// A failed step with no unmerged paths was not a merge conflict (bad ref,
    /// lock contention, ...) and must be reported as-is.
    ///
    /// # Errors
    /// Returns error if the status query itself fails.
    pub async fn detect<G: GitClient>(git: &G) -> Result<Option<Vec<String>>> {
        let status = git.status().await?;
        if status.has_conflicts() {
            Ok(Some(status.conflicted))
        } else {
            Ok(None)
        }
    }
}
