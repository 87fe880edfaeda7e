#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use which::which;

/// Finds and returns the path to the git binary
pub fn git_path() -> Result<OsString> {
    which("git")
        .map(PathBuf::into_os_string)
        .context("Cannot find git on path")
}

/// Finds `program` on the path, or returns it unchanged so the spawn error
/// names it.
pub fn program_path(program: &str) -> OsString {
    match which(program) {
        Ok(path) => path.into_os_string(),
        Err(_) => program.into(),
    }
}

/// Finds and returns the path to greencently itself, for hook scripts.
/// Falls back to a bare `greencently` resolved through `PATH` at hook time.
pub fn greencently_path() -> String {
    match which("greencently") {
        Ok(path) => path.display().to_string(),
        Err(_) => "greencently".into(),
    }
}

/// Milliseconds since the unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Quotes `word` for a POSIX shell unless it is plainly safe.
pub fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
