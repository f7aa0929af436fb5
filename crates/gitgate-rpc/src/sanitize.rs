//! Redaction of error text before it reaches the UI.
//!
//! Git messages routinely carry absolute paths, remote hosts and object ids.
//! Each rule below redacts one kind of value; rules run in order and can be
//! tested on their own.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// One named redaction.
#[derive(Debug)]
pub struct RedactionRule {
    pub name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl RedactionRule {
    // Patterns are literals covered by tests.
    #[allow(clippy::expect_used)]
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("redaction pattern must compile"),
            replacement,
        }
    }

    /// Apply this rule alone.
    #[must_use]
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.pattern.replace_all(text, self.replacement)
    }
}

static RULES: LazyLock<Vec<RedactionRule>> = LazyLock::new(|| {
    vec![
        RedactionRule::new("unix-home", r"(?:/home|/Users)/[^/\s]+", "~"),
        RedactionRule::new("windows-home", r"(?i)\b[A-Z]:\\Users\\[^\\\s]+", "~"),
        RedactionRule::new(
            "ipv4",
            r"\b(?:25[0-5]|2[0-4]\d|1?\d?\d)(?:\.(?:25[0-5]|2[0-4]\d|1?\d?\d)){3}\b",
            "[redacted-ip]",
        ),
        RedactionRule::new("hex-token", r"\b[0-9a-fA-F]{32,}\b", "[redacted-hash]"),
    ]
});

/// The redaction rules, in the order [`sanitize`] applies them.
#[must_use]
pub fn rules() -> &'static [RedactionRule] {
    &RULES
}

/// Apply every redaction rule to `message`.
#[must_use]
pub fn sanitize(message: &str) -> String {
    rules()
        .iter()
        .fold(message.to_string(), |text, rule| rule.apply(&text).into_owned())
}

/// Drop git's `fatal: ` / `error: ` prefixes from each line.
#[must_use]
pub fn strip_git_prefixes(message: &str) -> String {
    message
        .lines()
        .map(|line| {
            line.strip_prefix("fatal: ")
                .or_else(|| line.strip_prefix("error: "))
                .unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
