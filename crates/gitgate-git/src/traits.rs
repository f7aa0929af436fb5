//! Trait abstraction for the git collaborator.
//!
//! This module defines the `GitClient` trait which everything above this
//! crate talks to, enabling dependency injection and testability.

use std::future::Future;
use std::path::Path;

use crate::{RepoStatus, Result};

/// Trait for the git client used by controllers and gateway handlers.
///
/// This trait abstracts git execution, allowing for:
/// - Dependency injection of the process-backed [`GitCli`](crate::GitCli)
/// - Mock implementations for testing
/// - Alternative implementations (e.g., a library-backed client)
///
/// Every method is async: callers suspend only while git runs. Verb helpers
/// default to [`raw`](GitClient::raw) with the subcommand prepended, so an
/// implementation only has to provide `git_dir`, `status` and `raw`.
#[allow(clippy::missing_errors_doc)]
pub trait GitClient: Send + Sync {
    /// Path to the repository's `.git` directory.
    ///
    /// Rebase markers and todo scripts live under this path.
    fn git_dir(&self) -> &Path;

    /// Query the working tree and index status.
    fn status(&self) -> impl Future<Output = Result<RepoStatus>> + Send;

    /// Run git with the given argv and return its stdout.
    ///
    /// Fails with [`Error::CommandFailed`](crate::Error::CommandFailed) on a
    /// non-zero exit.
    fn raw(&self, args: Vec<String>) -> impl Future<Output = Result<String>> + Send;

    /// `git rebase <args>`.
    fn rebase(&self, args: Vec<String>) -> impl Future<Output = Result<String>> + Send {
        self.raw(subcommand("rebase", args))
    }

    /// `git cherry-pick <args>`.
    fn cherry_pick(&self, args: Vec<String>) -> impl Future<Output = Result<String>> + Send {
        self.raw(subcommand("cherry-pick", args))
    }

    /// `git revert <args>`.
    fn revert(&self, args: Vec<String>) -> impl Future<Output = Result<String>> + Send {
        self.raw(subcommand("revert", args))
    }

    /// `git merge <args>`.
    fn merge(&self, args: Vec<String>) -> impl Future<Output = Result<String>> + Send {
        self.raw(subcommand("merge", args))
    }

    /// `git commit <args>`.
    fn commit(&self, args: Vec<String>) -> impl Future<Output = Result<String>> + Send {
        self.raw(subcommand("commit", args))
    }
}

fn subcommand(name: &str, args: Vec<String>) -> Vec<String> {
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(name.to_string());
    argv.extend(args);
    argv
}
