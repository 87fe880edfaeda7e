#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    constants::{MARKER_FILE, MARKER_VERSION},
    fingerprint::Fingerprint,
    git::Repo,
    summary::RunSummary,
};

/// Errors reading or writing the green marker.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// The marker file could not be read, written or removed.
    #[error("Could not access marker {path}: {source}")]
    Io {
        /// Marker location.
        path:   PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The marker exists but is not a marker this version understands.
    #[error("Marker {path} is unreadable: {reason}")]
    Unreadable {
        /// Marker location.
        path:   PathBuf,
        /// What was wrong with it.
        reason: String,
    },
}

/// Proof that every test passed for a given working tree at a given time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Format version, see [`MARKER_VERSION`].
    pub version:        u32,
    /// When the green run finished, in milliseconds since the unix epoch.
    pub recorded_at_ms: u64,
    /// Working tree the run was green for.
    pub fingerprint:    Fingerprint,
    /// Test command that produced the run, one word per element.
    pub command:        Vec<String>,
    /// Counts reported by the run.
    pub summary:        RunSummary,
}

impl Marker {
    /// A marker in the current format.
    pub fn new(
        fingerprint: Fingerprint,
        command: Vec<String>,
        summary: RunSummary,
        recorded_at_ms: u64,
    ) -> Self {
        Self {
            version: MARKER_VERSION,
            recorded_at_ms,
            fingerprint,
            command,
            summary,
        }
    }
}

/// Location of the marker for one repository.
#[derive(Debug, Clone)]
pub struct MarkerStore {
    /// Path of the marker file.
    path: PathBuf,
}

impl MarkerStore {
    /// Marker store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Marker store inside the git directory of `repo`.
    pub fn for_repo(repo: &Repo) -> Self {
        Self::at(repo.git_dir().join(MARKER_FILE))
    }

    /// Path of the marker file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wraps an io error with the marker path.
    fn io(&self, source: std::io::Error) -> MarkerError {
        MarkerError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Wraps a reason the marker could not be understood.
    fn unreadable(&self, reason: impl ToString) -> MarkerError {
        MarkerError::Unreadable {
            path:   self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Reads the marker; `Ok(None)` when there is none.
    pub async fn read(&self) -> Result<Option<Marker>, MarkerError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io(e)),
        };

        let marker: Marker = serde_json::from_slice(&bytes).map_err(|e| self.unreadable(e))?;
        if marker.version != MARKER_VERSION {
            return Err(self.unreadable(format!(
                "version {} is not supported (expected {MARKER_VERSION})",
                marker.version
            )));
        }
        Ok(Some(marker))
    }

    /// Writes the marker to a sibling temp file, then renames it into place.
    pub async fn write(&self, marker: &Marker) -> Result<(), MarkerError> {
        let json = serde_json::to_vec_pretty(marker).map_err(|e| self.unreadable(e))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io(e))?;
        }

        let tmp = self.path.with_extension(format!("tmp.{}", std::process::id()));
        tokio::fs::write(&tmp, json).await.map_err(|e| self.io(e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(self.io(e));
        }

        tracing::debug!("wrote marker {}", self.path.display());
        Ok(())
    }

    /// Removes the marker. Removing a missing marker is not an error.
    /// Returns whether a marker was removed.
    pub async fn clear(&self) -> Result<bool, MarkerError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!("removed marker {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io(e)),
        }
    }
}
