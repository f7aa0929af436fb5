//! Process-backed git client.

use std::path::{Path, PathBuf};

use git2::StatusOptions;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::status::RepoStatus;
use crate::traits::GitClient;

/// Git client that shells out to the `git` executable.
///
/// Status queries go through libgit2 on a blocking thread; everything else runs
/// `git` as a child process in the working directory.
pub struct GitCli {
    workdir: PathBuf,
    git_dir: PathBuf,
    program: PathBuf,
}

impl GitCli {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent, or if the
    /// repository is bare.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repo = git2::Repository::discover(path).map_err(|_| Error::NotARepository)?;
        let workdir = repo.workdir().ok_or(Error::BareRepository)?.to_path_buf();

        Ok(Self {
            workdir,
            git_dir: repo.path().to_path_buf(),
            program: PathBuf::from("git"),
        })
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns error if not inside a git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Use a different git executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Get the path to the repository root (workdir).
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    async fn run(&self, args: Vec<String>) -> Result<String> {
        debug!(command = %args.join(" "), "running git");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.workdir)
            // Continue/revert must never block on an interactive editor.
            .env("GIT_EDITOR", "true")
            .env("GIT_TERMINAL_PROMPT", "0")
            .env_remove("GIT_SEQUENCE_EDITOR")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(Error::Spawn)?;

        if !output.status.success() {
            let err = Error::command_failed(&args, &output);
            debug!(code = ?output.status.code(), error = %err, "git failed");
            return Err(err);
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        trace!(bytes = stdout.len(), "git succeeded");
        Ok(stdout)
    }
}

fn read_status(git_dir: &Path) -> Result<RepoStatus> {
    let repo = git2::Repository::open(git_dir)?;

    let mut options = StatusOptions::new();
    options
        .include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    let mut status = RepoStatus::default();
    for entry in repo.statuses(Some(&mut options))?.iter() {
        if let Some(path) = entry.path() {
            status.record(path.to_string(), entry.status());
        }
    }

    Ok(status)
}

impl GitClient for GitCli {
    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    async fn status(&self) -> Result<RepoStatus> {
        let git_dir = self.git_dir.clone();
        tokio::task::spawn_blocking(move || read_status(&git_dir)).await?
    }

    async fn raw(&self, args: Vec<String>) -> Result<String> {
        self.run(args).await
    }
}

impl std::fmt::Debug for GitCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitCli")
            .field("path", &self.git_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    async fn init_test_repo() -> (TempDir, GitCli) {
        let temp = TempDir::new().unwrap();
        {
            let repo = git2::Repository::init(temp.path()).unwrap();
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }

        let git = GitCli::open(temp.path()).unwrap();
        fs::write(temp.path().join("file.txt"), "base\n").unwrap();
        git.raw(argv(&["add", "."])).await.unwrap();
        git.commit(argv(&["-m", "Initial commit"])).await.unwrap();
        (temp, git)
    }

    #[tokio::test]
    async fn test_open_discovers_from_subdirectory() {
        let (temp, _git) = init_test_repo().await;
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let git = GitCli::open(&nested).unwrap();
        assert!(git.git_dir().ends_with(".git"));
    }

    #[test]
    fn test_open_outside_repository() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            GitCli::open(temp.path()),
            Err(Error::NotARepository)
        ));
    }

    #[tokio::test]
    async fn test_raw_returns_stdout() {
        let (_temp, git) = init_test_repo().await;
        let head = git.raw(argv(&["rev-parse", "HEAD"])).await.unwrap();
        assert_eq!(head.trim().len(), 40);
    }

    #[tokio::test]
    async fn test_raw_failure_carries_git_message() {
        let (_temp, git) = init_test_repo().await;
        let err = git
            .raw(argv(&["rev-parse", "--verify", "no-such-ref"]))
            .await
            .unwrap_err();

        match err {
            Error::CommandFailed { command, message, .. } => {
                assert_eq!(command, "rev-parse --verify no-such-ref");
                assert!(message.starts_with("fatal:"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_status_reports_untracked_and_staged() {
        let (temp, git) = init_test_repo().await;
        fs::write(temp.path().join("new.txt"), "x").unwrap();
        fs::write(temp.path().join("file.txt"), "changed\n").unwrap();
        git.raw(argv(&["add", "file.txt"])).await.unwrap();

        let status = git.status().await.unwrap();
        assert_eq!(status.untracked, vec!["new.txt"]);
        assert_eq!(status.staged, vec!["file.txt"]);
        assert!(!status.has_conflicts());
    }

    #[tokio::test]
    async fn test_status_reports_cherry_pick_conflict() {
        let (temp, git) = init_test_repo().await;
        let main = git
            .raw(argv(&["rev-parse", "--abbrev-ref", "HEAD"]))
            .await
            .unwrap();

        git.raw(argv(&["checkout", "-b", "other"])).await.unwrap();
        fs::write(temp.path().join("file.txt"), "theirs\n").unwrap();
        git.commit(argv(&["-am", "theirs"])).await.unwrap();

        git.raw(argv(&["checkout", main.trim()])).await.unwrap();
        fs::write(temp.path().join("file.txt"), "ours\n").unwrap();
        git.commit(argv(&["-am", "ours"])).await.unwrap();

        assert!(git.cherry_pick(argv(&["other"])).await.is_err());

        let status = git.status().await.unwrap();
        assert_eq!(status.conflicted, vec!["file.txt"]);
    }
}
