//! Error types for gitgate-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to git.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// Bare repositories have no working tree to operate on.
    #[error("repository has no working directory")]
    BareRepository,

    /// The git executable could not be started.
    #[error("failed to run git: {0}")]
    Spawn(#[source] std::io::Error),

    /// Git exited with a non-zero status.
    ///
    /// Displays git's own diagnostic so callers can surface it unchanged.
    #[error("{message}")]
    CommandFailed {
        /// The subcommand and arguments that were run.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Trimmed stderr (or stdout when stderr was empty).
        message: String,
    },

    /// A blocking status task panicked or was cancelled.
    #[error("status task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}

impl Error {
    /// Build a `CommandFailed` from a finished process.
    pub(crate) fn command_failed(args: &[String], output: &std::process::Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };

        Self::CommandFailed {
            command: args.join(" "),
            code: output.status.code(),
            message,
        }
    }
}
