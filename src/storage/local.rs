//! Local filesystem state store.
//!
//! The whole state is one JSON document, replaced atomically: it is written
//! to `<file>.tmp` and renamed over `<file>`, so readers see either the old
//! or the new document and never a partial one.

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::State;

/// JSON state document on local disk.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling temp file used for atomic replacement.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Ensure the parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn encode(state: &State) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(state)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Read the state document.
    ///
    /// A missing file yields an empty state; so does a malformed one, with a
    /// warning. Other I/O failures are returned.
    pub async fn load(&self) -> Result<State> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file, starting empty");
                return Ok(State::new());
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        match serde_json::from_slice::<State>(&bytes) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "State file is corrupted; starting fresh"
                );
                Ok(State::new())
            }
        }
    }

    /// Write the state document atomically.
    pub async fn save(&self, state: &State) -> Result<()> {
        self.ensure_dir().await?;
        let bytes = Self::encode(state)?;

        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "State saved");
        Ok(())
    }

    /// Blocking variant of [`save`](Self::save) for contexts that cannot await.
    pub fn save_blocking(&self, state: &State) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = Self::encode(state)?;

        let tmp = self.tmp_path();
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
