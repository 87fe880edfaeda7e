#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};

use crate::{
    config,
    process::{Collected, Echo, run_collect},
    util::git_path,
};

/// A git working tree and the git binary used to inspect it.
#[derive(Debug, Clone)]
pub struct Repo {
    /// Top level of the working tree.
    root:    PathBuf,
    /// The repository's git directory (`.git`, or elsewhere for worktrees).
    git_dir: PathBuf,
    /// Path to the git binary.
    git:     OsString,
    /// Variables set on every git invocation; empty means inherit ours.
    env:     Vec<(OsString, OsString)>,
}

impl Repo {
    /// Finds the repository containing `start`.
    ///
    /// Inherits `GIT_DIR`, `GIT_INDEX_FILE` and friends, so inside a
    /// pre-commit hook this sees the index that is about to be committed.
    pub async fn discover(start: &Path) -> Result<Self> {
        let git = git_path()?;

        let root = Self::query(&git, start, &[], &["rev-parse", "--show-toplevel"])
            .await
            .with_context(|| format!("{} is not inside a git working tree", start.display()))?;
        let root = PathBuf::from(root);

        let git_dir = Self::query(&git, &root, &[], &["rev-parse", "--git-dir"]).await?;
        let git_dir = root.join(git_dir);

        tracing::debug!("repository at {}, git dir {}", root.display(), git_dir.display());
        Ok(Self {
            root,
            git_dir,
            git,
            env: Vec::new(),
        })
    }

    /// Opens the non-bare repository whose working tree is `root`, pinning
    /// `GIT_DIR`, `GIT_WORK_TREE` and `GIT_INDEX_FILE` to it regardless of
    /// what our own environment says.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let git_dir = root.join(".git");
        if !git_dir.is_dir() {
            bail!("{} has no .git directory", root.display());
        }

        let env = vec![
            (OsString::from("GIT_DIR"), git_dir.clone().into_os_string()),
            (OsString::from("GIT_WORK_TREE"), root.clone().into_os_string()),
            (OsString::from("GIT_INDEX_FILE"), git_dir.join("index").into_os_string()),
        ];

        Ok(Self {
            root,
            git_dir,
            git: git_path()?,
            env,
        })
    }

    /// Runs a git query and returns its trimmed stdout.
    async fn query(
        git: &OsString,
        cwd: &Path,
        env: &[(OsString, OsString)],
        args: &[&str],
    ) -> Result<String> {
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        let out = run_collect(git, &args, Some(cwd), env, Some(config::git_timeout()), Echo::Quiet)
            .await?;
        if !out.success() {
            bail!("git {:?} failed: {}", args, String::from_utf8_lossy(&out.stderr).trim());
        }
        Ok(out.stdout_text().trim_end().to_string())
    }

    /// Top level of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The repository's git directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Directory git runs hooks from, honoring `core.hooksPath`.
    pub async fn hooks_dir(&self) -> Result<PathBuf> {
        let hooks = Self::query(
            &self.git,
            &self.root,
            &self.env,
            &["rev-parse", "--git-path", "hooks"],
        )
        .await?;
        Ok(self.root.join(hooks))
    }

    /// Runs git in the working tree and returns whatever it produced,
    /// successful or not.
    pub async fn run(&self, args: &[&str]) -> Result<Collected> {
        let args: Vec<OsString> = args.iter().map(OsString::from).collect();
        run_collect(
            &self.git,
            &args,
            Some(&self.root),
            &self.env,
            Some(config::git_timeout()),
            Echo::Quiet,
        )
        .await
    }

    /// Runs git in the working tree and returns stdout, failing on a non-zero
    /// exit.
    pub async fn output(&self, args: &[&str]) -> Result<Vec<u8>> {
        let out = self.run(args).await?;
        if !out.success() {
            bail!("git {} failed: {}", args.join(" "), String::from_utf8_lossy(&out.stderr).trim());
        }
        Ok(out.stdout)
    }
}
