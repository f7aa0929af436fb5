//! Terminal output formatting utilities.

use colored::Colorize;
use gitgate_core::OperationKind;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message.
pub fn info(msg: &str) {
    println!("{} {}", "→".blue(), msg);
}

/// Print a detail line without prefix.
pub fn detail(msg: &str) {
    println!("{msg}");
}

/// Print machine-readable output.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Operation name, highlighted.
#[must_use]
pub fn operation(kind: OperationKind) -> String {
    kind.verb().cyan().bold().to_string()
}

/// A conflicted path, in red.
#[must_use]
pub fn conflicted(path: &str) -> String {
    path.red().to_string()
}

/// First 8 characters of a commit hash, dimmed.
#[must_use]
pub fn short_hash(hash: &str) -> String {
    hash.get(..8).unwrap_or(hash).dimmed().to_string()
}
