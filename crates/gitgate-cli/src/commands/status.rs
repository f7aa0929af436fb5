//! `gitgate status` - report what git has in flight, straight from disk.

use anyhow::Result;
use gitgate_core::{OperationKind, RebaseProgress, markers};
use gitgate_git::{GitClient, RepoStatus};
use serde::Serialize;

use super::RepoArgs;
use crate::output;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusOutput {
    in_progress: Option<OperationKind>,
    rebase: Option<RebaseProgress>,
    conflicted: Vec<String>,
}

/// Run the status command.
pub fn run(json: bool, args: &RepoArgs) -> Result<()> {
    let git = args.open()?;
    let RepoStatus { conflicted, .. } = super::runtime()?.block_on(git.status())?;

    let status = StatusOutput {
        in_progress: markers::in_progress(git.git_dir()),
        rebase: markers::rebase_progress(git.git_dir())?,
        conflicted,
    };

    if json {
        output::essential(&serde_json::to_string_pretty(&status)?);
    } else {
        print_status(&status);
    }
    Ok(())
}

fn print_status(status: &StatusOutput) {
    let Some(kind) = status.in_progress else {
        output::success("No rebase, cherry-pick or revert in progress");
        return;
    };

    output::info(&format!("{} in progress", output::operation(kind)));

    if let Some(progress) = &status.rebase {
        let branch = progress.head_name.as_deref().unwrap_or("detached HEAD");
        output::detail(&format!(
            "  {branch}: step {} of {}",
            progress.current, progress.total
        ));
        if let Some(commit) = &progress.stopped_at {
            output::detail(&format!("  stopped at {}", output::short_hash(commit)));
        }
    }

    if status.conflicted.is_empty() {
        output::detail(&format!("  no conflicts - run `git {kind} --continue`"));
    } else {
        output::warn(&format!("{} conflicted file(s):", status.conflicted.len()));
        for file in &status.conflicted {
            output::detail(&format!("  {}", output::conflicted(file)));
        }
    }
}
