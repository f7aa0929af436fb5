//! Mock implementation of [`GitClient`] for testing.
//!
//! Records every argv it is asked to run and replays configured failures,
//! outputs and conflicted paths, so controller and gateway logic can be
//! exercised without a real repository. Injected conflicts also leave the
//! marker git itself would write (`rebase-merge/`, `CHERRY_PICK_HEAD`,
//! `REVERT_HEAD`) in the mock's git directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tempfile::TempDir;
use tokio::sync::Notify;

use crate::{Error, GitClient, RepoStatus, Result};

struct Failure {
    argv: Vec<String>,
    message: String,
    conflicted: Vec<String>,
    once: bool,
}

/// Mock git client.
pub struct MockGit {
    git_dir: PathBuf,
    _scratch: Option<TempDir>,
    markers: Mutex<Vec<PathBuf>>,
    gates: Mutex<HashMap<Vec<String>, Arc<Notify>>>,
    calls: Mutex<Vec<Vec<String>>>,
    failures: Mutex<Vec<Failure>>,
    outputs: Mutex<HashMap<Vec<String>, String>>,
    status: Mutex<RepoStatus>,
    status_error: Mutex<Option<String>>,
}

impl Default for MockGit {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn to_argv(args: &[&str]) -> Vec<String> {
    args.iter().map(ToString::to_string).collect()
}

/// The marker git leaves while `verb` is stopped mid-way.
fn marker_for(git_dir: &Path, args: &[String]) -> Option<PathBuf> {
    args.iter().find_map(|arg| match arg.as_str() {
        "rebase" => Some(git_dir.join("rebase-merge")),
        "cherry-pick" => Some(git_dir.join("CHERRY_PICK_HEAD")),
        "revert" => Some(git_dir.join("REVERT_HEAD")),
        _ => None,
    })
}

impl MockGit {
    /// Mock backed by a fresh scratch git directory.
    #[must_use]
    pub fn new() -> Self {
        let scratch = tempfile::tempdir().ok();
        let git_dir = scratch.as_ref().map_or_else(
            || std::env::temp_dir().join("mock-gitgate/.git"),
            |dir| dir.path().to_path_buf(),
        );
        Self {
            git_dir,
            _scratch: scratch,
            markers: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            outputs: Mutex::new(HashMap::new()),
            status: Mutex::new(RepoStatus::default()),
            status_error: Mutex::new(None),
        }
    }

    /// Point `git_dir()` somewhere real, typically a `TempDir`.
    #[must_use]
    pub fn with_git_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.git_dir = path.into();
        self
    }

    /// Fail the next run of exactly `args`, leaving `conflicted` unmerged.
    #[must_use]
    pub fn with_conflict(self, args: &[&str], conflicted: &[&str]) -> Self {
        self.push_failure(args, "error: could not apply", conflicted, true);
        self
    }

    /// Fail the next run of exactly `args` without leaving conflicts.
    #[must_use]
    pub fn with_failure(self, args: &[&str], message: &str) -> Self {
        self.push_failure(args, message, &[], true);
        self
    }

    /// Fail every run of exactly `args`.
    #[must_use]
    pub fn with_persistent_failure(self, args: &[&str], message: &str) -> Self {
        self.push_failure(args, message, &[], false);
        self
    }

    /// Return `stdout` whenever exactly `args` runs successfully.
    #[must_use]
    pub fn with_output(self, args: &[&str], stdout: &str) -> Self {
        lock(&self.outputs).insert(to_argv(args), stdout.to_string());
        self
    }

    /// Hold the next run of exactly `args` until `gate` is notified.
    ///
    /// The call is recorded before it waits.
    #[must_use]
    pub fn with_gate(self, args: &[&str], gate: Arc<Notify>) -> Self {
        lock(&self.gates).insert(to_argv(args), gate);
        self
    }

    /// Make `status()` fail.
    #[must_use]
    pub fn with_status_error(self, message: &str) -> Self {
        *lock(&self.status_error) = Some(message.to_string());
        self
    }

    /// Replace the conflicted paths `status()` reports.
    pub fn set_conflicted(&self, files: &[&str]) {
        lock(&self.status).conflicted = to_argv(files);
    }

    /// Every argv run so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        lock(&self.calls).clone()
    }

    /// Every argv run so far, joined with spaces.
    #[must_use]
    pub fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(|argv| argv.join(" ")).collect()
    }

    fn push_failure(&self, args: &[&str], message: &str, conflicted: &[&str], once: bool) {
        lock(&self.failures).push(Failure {
            argv: to_argv(args),
            message: message.to_string(),
            conflicted: to_argv(conflicted),
            once,
        });
    }

    /// Leave git's in-progress marker for the verb in `args`.
    fn stop(&self, args: &[String]) {
        let Some(marker) = marker_for(&self.git_dir, args) else {
            return;
        };
        if marker.exists() {
            return;
        }
        let written = if marker.ends_with("rebase-merge") {
            fs::create_dir_all(&marker)
        } else {
            fs::write(&marker, "0000000\n")
        };
        if written.is_ok() {
            lock(&self.markers).push(marker);
        }
    }

    /// Remove markers this mock wrote for the verb in `args`.
    fn settle(&self, args: &[String]) {
        let Some(marker) = marker_for(&self.git_dir, args) else {
            return;
        };
        let mut markers = lock(&self.markers);
        if let Some(index) = markers.iter().position(|m| *m == marker) {
            let marker = markers.remove(index);
            let _removed = if marker.is_dir() {
                fs::remove_dir_all(&marker)
            } else {
                fs::remove_file(&marker)
            };
        }
    }

    fn respond(&self, args: Vec<String>) -> Result<String> {
        let mut failures = lock(&self.failures);
        if let Some(index) = failures.iter().position(|f| f.argv == args) {
            let message = failures[index].message.clone();
            let conflicted = failures[index].conflicted.clone();
            if failures[index].once {
                failures.remove(index);
            }
            drop(failures);

            if !conflicted.is_empty() {
                lock(&self.status).conflicted = conflicted;
                self.stop(&args);
            }
            return Err(Error::CommandFailed {
                command: args.join(" "),
                code: Some(1),
                message,
            });
        }
        drop(failures);

        // A successful continue, skip or abort leaves nothing unmerged.
        if args
            .iter()
            .any(|a| matches!(a.as_str(), "--continue" | "--skip" | "--abort"))
        {
            lock(&self.status).conflicted.clear();
            self.settle(&args);
        }

        Ok(lock(&self.outputs).get(&args).cloned().unwrap_or_default())
    }
}

impl GitClient for MockGit {
    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    async fn status(&self) -> Result<RepoStatus> {
        if let Some(message) = lock(&self.status_error).clone() {
            return Err(Error::CommandFailed {
                command: "status".into(),
                code: Some(128),
                message,
            });
        }
        Ok(lock(&self.status).clone())
    }

    async fn raw(&self, args: Vec<String>) -> Result<String> {
        lock(&self.calls).push(args.clone());
        let gate = lock(&self.gates).remove(&args);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.respond(args)
    }
}
