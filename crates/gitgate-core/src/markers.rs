//! On-disk git state markers.
//!
//! Git records an in-flight rebase, cherry-pick or revert as files under the
//! `.git` directory. Reading them directly tells the truth about the
//! repository even after a restart, independent of any controller's
//! in-memory state.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OperationError, Result};
use crate::state::OperationKind;

const REBASE_MERGE_DIR: &str = "rebase-merge";
const REBASE_APPLY_DIR: &str = "rebase-apply";
const TODO_FILE: &str = "git-rebase-todo";

/// Which rebase backend left the markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RebaseBackend {
    /// `rebase-merge/` (the default and interactive backend).
    Merge,
    /// `rebase-apply/` (`git rebase --apply` and `git am`).
    Apply,
}

/// Progress of a rebase, read from its state directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebaseProgress {
    /// 1-based index of the step being applied (0 before the first step).
    pub current: usize,
    /// Total number of steps.
    pub total: usize,
    /// Branch being rebased, without the `refs/heads/` prefix.
    pub head_name: Option<String>,
    /// Commit git stopped on, from `REBASE_HEAD`.
    pub stopped_at: Option<String>,
    pub backend: RebaseBackend,
}

/// Whether a rebase state directory exists.
#[must_use]
pub fn is_rebasing(git_dir: &Path) -> bool {
    git_dir.join(REBASE_MERGE_DIR).is_dir() || git_dir.join(REBASE_APPLY_DIR).is_dir()
}

/// The sequential operation git has in flight, if any.
#[must_use]
pub fn in_progress(git_dir: &Path) -> Option<OperationKind> {
    if is_rebasing(git_dir) {
        Some(OperationKind::Rebase)
    } else if git_dir.join("CHERRY_PICK_HEAD").is_file() {
        Some(OperationKind::CherryPick)
    } else if git_dir.join("REVERT_HEAD").is_file() {
        Some(OperationKind::Revert)
    } else {
        None
    }
}

/// Read rebase progress without touching anything.
///
/// # Errors
/// Returns error if a marker file exists but cannot be read.
pub fn rebase_progress(git_dir: &Path) -> io::Result<Option<RebaseProgress>> {
    let merge_dir = git_dir.join(REBASE_MERGE_DIR);
    let apply_dir = git_dir.join(REBASE_APPLY_DIR);

    let (dir, current_file, total_file, backend) = if merge_dir.is_dir() {
        (merge_dir, "msgnum", "end", RebaseBackend::Merge)
    } else if apply_dir.is_dir() {
        (apply_dir, "next", "last", RebaseBackend::Apply)
    } else {
        return Ok(None);
    };

    let head_name = read_trimmed(&dir.join("head-name"))?
        .map(|name| name.strip_prefix("refs/heads/").map_or(name.clone(), String::from));

    Ok(Some(RebaseProgress {
        current: read_number(&dir.join(current_file))?,
        total: read_number(&dir.join(total_file))?,
        head_name,
        stopped_at: stopped_commit(git_dir)?,
        backend,
    }))
}

/// The commit a paused rebase stopped on (`REBASE_HEAD`).
///
/// # Errors
/// Returns error if the file exists but cannot be read.
pub fn stopped_commit(git_dir: &Path) -> io::Result<Option<String>> {
    read_trimmed(&git_dir.join("REBASE_HEAD"))
}

/// Location of the interactive rebase todo script, if git created one.
#[must_use]
pub fn todo_path(git_dir: &Path) -> Option<PathBuf> {
    let path = git_dir.join(REBASE_MERGE_DIR).join(TODO_FILE);
    path.is_file().then_some(path)
}

/// Overwrite a todo script with the given entries.
///
/// # Errors
/// Returns `InvalidTodoEntry` if any entry would span more than one line,
/// or the IO error if the file cannot be written.
pub fn write_todo(path: &Path, entries: &[TodoEntry]) -> Result<()> {
    validate_todo(entries)?;
    fs::write(path, render_todo(entries))?;
    Ok(())
}

/// Check that every entry renders as exactly one todo line.
///
/// Git runs `exec` lines from the script, so a line break anywhere in an
/// entry would let the caller append commands.
///
/// # Errors
/// Returns `InvalidTodoEntry` naming the first offending entry.
pub fn validate_todo(entries: &[TodoEntry]) -> Result<()> {
    for (index, entry) in entries.iter().enumerate() {
        entry
            .check()
            .map_err(|reason| OperationError::InvalidTodoEntry { index, reason })?;
    }
    Ok(())
}

/// One `<action> <hash> [message]` line per entry.
#[must_use]
pub fn render_todo(entries: &[TodoEntry]) -> String {
    entries.iter().map(|entry| format!("{entry}\n")).collect()
}

fn read_trimmed(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content.trim().to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn read_number(path: &Path) -> io::Result<usize> {
    Ok(read_trimmed(path)?
        .and_then(|s| s.parse().ok())
        .unwrap_or(0))
}

/// Interactive rebase action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RebaseAction {
    Pick,
    Reword,
    Edit,
    Squash,
    Fixup,
    Drop,
}

impl RebaseAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pick => "pick",
            Self::Reword => "reword",
            Self::Edit => "edit",
            Self::Squash => "squash",
            Self::Fixup => "fixup",
            Self::Drop => "drop",
        }
    }
}

impl fmt::Display for RebaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RebaseAction {
    type Err = OperationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pick" => Ok(Self::Pick),
            "reword" => Ok(Self::Reword),
            "edit" => Ok(Self::Edit),
            "squash" => Ok(Self::Squash),
            "fixup" => Ok(Self::Fixup),
            "drop" => Ok(Self::Drop),
            other => Err(OperationError::InvalidAction(other.to_string())),
        }
    }
}

impl TryFrom<String> for RebaseAction {
    type Error = OperationError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RebaseAction> for String {
    fn from(action: RebaseAction) -> Self {
        action.as_str().to_string()
    }
}

/// A caller-supplied todo line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoEntry {
    pub hash: String,
    pub action: RebaseAction,
    /// Subject shown after the hash; git ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TodoEntry {
    #[must_use]
    pub fn new(action: RebaseAction, hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            action,
            message: None,
        }
    }

    fn check(&self) -> std::result::Result<(), &'static str> {
        if self.hash.is_empty() || self.hash.starts_with('-') {
            return Err("hash must be a commit id");
        }
        if self.hash.chars().any(char::is_whitespace) {
            return Err("hash may not contain whitespace");
        }
        if self
            .message
            .as_deref()
            .is_some_and(|m| m.contains(['\r', '\n']))
        {
            return Err("message must be a single line");
        }
        Ok(())
    }
}

impl fmt::Display for TodoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action, self.hash)?;
        if let Some(message) = &self.message {
            write!(f, " {message}")?;
        }
        Ok(())
    }
}
