#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{fmt::Display, path::Path};

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, BufReader};

use crate::git::Repo;

/// Read size when hashing untracked files.
const CHUNK: usize = 64 * 1024;

/// Content hash of a working tree: HEAD, staged changes, unstaged changes and
/// untracked files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

/// Incremental builder; each part is length-prefixed so parts cannot bleed
/// into each other.
#[derive(Default)]
pub struct FingerprintBuilder(Sha256);

impl FingerprintBuilder {
    /// Starts an empty fingerprint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mixes in one labelled part.
    pub fn part(mut self, label: &str, bytes: &[u8]) -> Self {
        self.0.update(label.as_bytes());
        self.0.update([0u8]);
        self.0.update((bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
        self
    }

    /// Finishes as lowercase hex.
    pub fn finish(self) -> Fingerprint {
        Fingerprint(hex::encode(self.0.finalize()))
    }
}

impl Fingerprint {
    /// Wraps an already computed hex digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First twelve characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }

    /// Fingerprints the current state of `repo`.
    pub async fn compute(repo: &Repo) -> Result<Self> {
        let diff_args = ["--binary", "--no-color", "--no-ext-diff"];
        let staged_args = [&["diff", "--cached"][..], &diff_args[..]].concat();
        let unstaged_args = [&["diff"][..], &diff_args[..]].concat();

        let (head, staged, unstaged, untracked) = futures::try_join!(
            repo.run(&["rev-parse", "--verify", "--quiet", "HEAD"]),
            repo.output(&staged_args),
            repo.output(&unstaged_args),
            repo.output(&["ls-files", "--others", "--exclude-standard", "-z"]),
        )
        .context("Could not inspect the working tree")?;

        let head = if head.success() {
            head.stdout
        } else {
            b"unborn".to_vec()
        };

        let mut builder = FingerprintBuilder::new()
            .part("head", head.trim_ascii())
            .part("staged", &staged)
            .part("unstaged", &unstaged);

        let names = untracked
            .split(|b| *b == 0)
            .filter(|name| !name.is_empty())
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .sorted()
            .collect::<Vec<_>>();

        for name in names {
            builder = builder.part("untracked", name.as_bytes());
            builder = builder.part("contents", &hash_untracked(repo.root(), &name).await?);
        }

        let fingerprint = builder.finish();
        tracing::debug!("working tree fingerprint {}", fingerprint.short());
        Ok(fingerprint)
    }
}

/// Hashes an untracked file in fixed-size chunks. Files that vanished since
/// git listed them hash as empty; anything that is not a regular file hashes
/// as its kind.
async fn hash_untracked(root: &Path, name: &str) -> Result<Vec<u8>> {
    let path = root.join(name);
    let mut hasher = Sha256::new();
    match tokio::fs::symlink_metadata(&path).await {
        Ok(meta) if meta.is_file() => {
            let file = match tokio::fs::File::open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(hasher.finalize().to_vec());
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Could not open {}", path.display()));
                }
            };
            let mut reader = BufReader::with_capacity(CHUNK, file);
            let mut chunk = vec![0u8; CHUNK];
            loop {
                let n = reader
                    .read(&mut chunk)
                    .await
                    .with_context(|| format!("Could not read {}", path.display()))?;
                if n == 0 {
                    break;
                }
                hasher.update(&chunk[..n]);
            }
        }
        Ok(meta) if meta.is_symlink() => {
            let target = tokio::fs::read_link(&path)
                .await
                .with_context(|| format!("Could not read link {}", path.display()))?;
            hasher.update(format!("symlink:{}", target.display()).as_bytes());
        }
        Ok(_) => hasher.update(b"other"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).with_context(|| format!("Could not stat {}", path.display())),
    }
    Ok(hasher.finalize().to_vec())
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_are_length_prefixed() {
        let a = FingerprintBuilder::new().part("x", b"ab").part("x", b"c").finish();
        let b = FingerprintBuilder::new().part("x", b"a").part("x", b"bc").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn same_input_same_digest() {
        let a = FingerprintBuilder::new().part("head", b"abc").finish();
        let b = FingerprintBuilder::new().part("head", b"abc").finish();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert_eq!(a.short().len(), 12);
    }
}
