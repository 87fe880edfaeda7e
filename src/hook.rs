#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use thiserror::Error;

use crate::{constants::HOOK_SIGNATURE, util::shell_quote};

/// File name of the hook inside the hooks directory.
pub const PRE_COMMIT: &str = "pre-commit";

/// Errors installing or removing the pre-commit hook.
#[derive(Debug, Error)]
pub enum HookError {
    /// A hook greencently did not write is in the way.
    #[error("{0} exists and was not installed by greencently (use --force to replace it)")]
    Foreign(PathBuf),
    /// No command to run from the hook.
    #[error("No test command given for the hook")]
    NoCommand,
    /// Filesystem trouble.
    #[error("Could not access hook {path}: {source}")]
    Io {
        /// Hook location.
        path:   PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// What `uninstall` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Our hook was removed.
    Removed,
    /// There was no hook.
    Absent,
    /// Someone else's hook was left alone.
    LeftForeign,
}

/// Renders the hook script that gates commits on `command`.
pub fn script(greencently: &str, command: &[String]) -> String {
    format!(
        "#!/bin/sh\n{HOOK_SIGNATURE}\nexec {} gate -- {}\n",
        shell_quote(greencently),
        command.iter().map(|word| shell_quote(word)).join(" ")
    )
}

/// Reads an existing hook, `None` if there is none.
async fn existing(path: &Path) -> Result<Option<String>, HookError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(HookError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes the pre-commit hook into `hooks_dir`. Someone else's hook is only
/// replaced when `force` is set.
pub async fn install(
    hooks_dir: &Path,
    greencently: &str,
    command: &[String],
    force: bool,
) -> Result<PathBuf, HookError> {
    if command.is_empty() {
        return Err(HookError::NoCommand);
    }

    let path = hooks_dir.join(PRE_COMMIT);
    if let Some(current) = existing(&path).await?
        && !current.contains(HOOK_SIGNATURE)
    {
        if !force {
            return Err(HookError::Foreign(path));
        }
        tracing::warn!("replacing existing hook {}", path.display());
    }

    let io = |source: std::io::Error| HookError::Io {
        path: path.clone(),
        source,
    };
    tokio::fs::create_dir_all(hooks_dir).await.map_err(io)?;
    tokio::fs::write(&path, script(greencently, command))
        .await
        .map_err(io)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(io)?;
    }

    tracing::info!("installed {}", path.display());
    Ok(path)
}

/// Removes the pre-commit hook from `hooks_dir` if greencently wrote it.
pub async fn uninstall(hooks_dir: &Path) -> Result<Removal, HookError> {
    let path = hooks_dir.join(PRE_COMMIT);
    match existing(&path).await? {
        None => Ok(Removal::Absent),
        Some(current) if !current.contains(HOOK_SIGNATURE) => {
            tracing::warn!("{} was not installed by greencently, leaving it", path.display());
            Ok(Removal::LeftForeign)
        }
        Some(_) => {
            tokio::fs::remove_file(&path)
                .await
                .map_err(|source| HookError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing::info!("removed {}", path.display());
            Ok(Removal::Removed)
        }
    }
}
