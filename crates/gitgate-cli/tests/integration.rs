//! Integration tests for the gitgate CLI.
//!
//! These run the binary against real temporary repositories.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::process::Command as StdCommand;
use tempfile::TempDir;

fn git(dir: &TempDir, args: &[&str]) -> String {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Helper to create a git repository in a temp directory.
fn setup_git_repo() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");

    git(&temp, &["init"]);
    git(&temp, &["config", "user.email", "test@example.com"]);
    git(&temp, &["config", "user.name", "Test User"]);
    git(&temp, &["config", "core.editor", "true"]);

    fs::write(temp.path().join("README.md"), "# Test Repo\n").expect("Failed to write README");
    git(&temp, &["add", "."]);
    git(&temp, &["commit", "-m", "Initial commit"]);
    git(&temp, &["branch", "-M", "main"]);

    temp
}

/// Commit `content` to `file` and return the new commit hash.
fn commit_file(dir: &TempDir, file: &str, content: &str, msg: &str) -> String {
    fs::write(dir.path().join(file), content).expect("Failed to write file");
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", msg]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Helper to get gitgate command.
fn gitgate() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gitgate"));
    cmd.env("GITGATE_LOG", "off");
    cmd
}

fn responses(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("response is JSON"))
        .collect()
}

#[test]
fn test_help() {
    gitgate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("call"));
}

#[test]
fn test_outside_repository_fails() {
    let temp = TempDir::new().unwrap();

    gitgate()
        .args(["call", "git.isRebasing"])
        .current_dir(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not inside a git repository"));
}

#[test]
fn test_call_is_rebasing() {
    let temp = setup_git_repo();

    gitgate()
        .args(["call", "git.isRebasing"])
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("false"));
}

#[test]
fn test_call_unknown_method() {
    let temp = setup_git_repo();

    gitgate()
        .args(["call", "git.nope"])
        .current_dir(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown method: git.nope"));
}

#[test]
fn test_call_rejects_invalid_params() {
    let temp = setup_git_repo();

    gitgate()
        .args(["call", "git.cherryPick", r#"["abc"]"#])
        .current_dir(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected array, got string"));
}

#[test]
fn test_cherry_pick_applies_commit() {
    let temp = setup_git_repo();
    git(&temp, &["checkout", "-b", "feature"]);
    let hash = commit_file(&temp, "feature.txt", "feature\n", "Add feature");
    git(&temp, &["checkout", "main"]);

    gitgate()
        .args(["call", "git.cherryPick", &format!(r#"[["{hash}"]]"#)])
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));

    assert!(temp.path().join("feature.txt").exists());
}

#[test]
fn test_cherry_pick_conflict_reports_files() {
    let temp = setup_git_repo();
    git(&temp, &["checkout", "-b", "feature"]);
    let hash = commit_file(&temp, "shared.txt", "from feature\n", "Feature edit");
    git(&temp, &["checkout", "main"]);
    commit_file(&temp, "shared.txt", "from main\n", "Main edit");

    gitgate()
        .args(["call", "git.cherryPick", &format!(r#"[["{hash}"]]"#)])
        .current_dir(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cherry-pick conflict"))
        .stderr(predicate::str::contains("shared.txt"))
        // Full hashes never reach the UI.
        .stderr(predicate::str::contains(hash.as_str()).not());

    gitgate()
        .args(["status", "--json"])
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"inProgress\": \"cherryPick\""))
        .stdout(predicate::str::contains("shared.txt"));
}

#[test]
fn test_flag_shaped_ref_runs_nothing() {
    let temp = setup_git_repo();
    git(&temp, &["checkout", "-b", "feature", "--track", "main"]);
    let marker = temp.path().join("pwned");

    gitgate()
        .args([
            "call",
            "git.rebase",
            &format!(r#"["--exec=touch {}"]"#, marker.display()),
        ])
        .current_dir(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match pattern"));

    assert!(!marker.exists());
}

#[test]
fn test_todo_message_cannot_add_lines() {
    let temp = setup_git_repo();
    let base = git(&temp, &["rev-parse", "HEAD"]);
    let hash = commit_file(&temp, "second.txt", "second\n", "Second");
    let marker = temp.path().join("pwned");

    let entries = serde_json::json!([
        base,
        [{
            "hash": hash,
            "action": "pick",
            "message": format!("Second\nexec touch {}", marker.display()),
        }]
    ]);
    gitgate()
        .args(["call", "git.interactiveRebase", &entries.to_string()])
        .current_dir(&temp)
        .assert()
        .failure();

    assert!(!marker.exists());
    assert!(!temp.path().join(".git/rebase-merge").exists());
}

#[test]
fn test_cherry_pick_refused_during_rebase() {
    let temp = setup_git_repo();
    git(&temp, &["checkout", "-b", "other"]);
    commit_file(&temp, "f.txt", "other\n", "Other edit");
    git(&temp, &["checkout", "main"]);
    commit_file(&temp, "f.txt", "main\n", "Main edit");
    let unrelated = commit_file(&temp, "g.txt", "g\n", "Unrelated");
    git(&temp, &["reset", "--hard", "HEAD~1"]);
    git(&temp, &["rebase", "other"]);
    assert!(temp.path().join(".git/rebase-merge").exists());

    gitgate()
        .args(["call", "git.cherryPick", &format!(r#"[["{unrelated}"]]"#)])
        .current_dir(&temp)
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "cannot start cherry-pick: a rebase is already in progress",
        ));
}

#[test]
fn test_status_when_idle() {
    let temp = setup_git_repo();

    gitgate()
        .arg("status")
        .current_dir(&temp)
        .assert()
        .success()
        .stdout(predicate::str::contains("No rebase, cherry-pick or revert in progress"));
}

#[test]
fn test_serve_answers_each_line() {
    let temp = setup_git_repo();

    let input = [
        r#"{"id": 1, "method": "git.isRebasing", "params": []}"#,
        r#"{"id": "two", "method": "git.revertState"}"#,
        "not json",
        r#"{"id": 4, "params": []}"#,
    ]
    .join("\n");

    let output = gitgate()
        .arg("serve")
        .current_dir(&temp)
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    // Responses arrive in completion order.
    let responses = responses(&output.stdout);
    assert_eq!(responses.len(), 4);

    let by_id = |id: Value| responses.iter().find(|r| r["id"] == id).unwrap().clone();
    assert_eq!(by_id(Value::from(1))["result"], Value::Bool(false));
    assert_eq!(by_id(Value::from("two"))["result"]["type"], "idle");
    assert_eq!(
        by_id(Value::from(4))["error"],
        "Invalid request: method must be a non-empty string"
    );
    assert!(responses.iter().any(|r| r["id"].is_null()
        && r["error"].as_str().unwrap().starts_with("Invalid request")));
}

#[test]
fn test_config_file_enables_rate_limit() {
    let temp = setup_git_repo();
    fs::write(
        temp.path().join(".git/gitgate.toml"),
        "[rate_limit]\nmax_requests = 1\n",
    )
    .unwrap();

    let input = [
        r#"{"id": 1, "method": "git.rebaseState", "params": []}"#,
        r#"{"id": 2, "method": "git.rebaseState", "params": []}"#,
    ]
    .join("\n");

    let output = gitgate()
        .arg("serve")
        .current_dir(&temp)
        .write_stdin(input)
        .output()
        .unwrap();

    let responses = responses(&output.stdout);
    let limited: Vec<_> = responses
        .iter()
        .filter(|r| r["error"] == "Rate limit exceeded for git.rebaseState")
        .collect();
    assert_eq!(limited.len(), 1);
}

#[test]
fn test_completions() {
    gitgate()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gitgate"));
}
