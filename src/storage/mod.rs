//! State persistence.
//!
//! `StateStore` reads and atomically writes the JSON state document.
//! `StateGuard` scopes the in-memory state for a run: callers flush it at
//! the points that matter (after each alert, after each pass) and whatever
//! is still unsaved when the guard goes away is written on drop.

pub mod local;

use std::ops::Deref;

use tracing::{error, info};

use crate::error::Result;
use crate::models::State;

// Re-export for convenience
pub use local::StateStore;

/// Loaded state bound to its store, flushed on every exit path.
#[derive(Debug)]
pub struct StateGuard {
    store: StateStore,
    state: State,
    dirty: bool,
}

impl StateGuard {
    /// Load the state from `store`.
    pub async fn open(store: StateStore) -> Result<Self> {
        let state = store.load().await?;
        info!(
            path = %store.path().display(),
            positions = state.positions().count(),
            alerts = state.alert_count(),
            "State loaded"
        );
        Ok(Self {
            store,
            state,
            dirty: false,
        })
    }

    /// Mutable access; marks the state as unsaved.
    pub fn state_mut(&mut self) -> &mut State {
        self.dirty = true;
        &mut self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist now.
    pub async fn flush(&mut self) -> Result<()> {
        self.store.save(&self.state).await?;
        self.dirty = false;
        Ok(())
    }

    /// Persist and release.
    pub async fn close(mut self) -> Result<()> {
        self.flush().await
    }
}

impl Deref for StateGuard {
    type Target = State;

    fn deref(&self) -> &State {
        &self.state
    }
}

impl Drop for StateGuard {
    fn drop(&mut self) {
        if !self.dirty {
            return;
        }
        match self.store.save_blocking(&self.state) {
            Ok(()) => info!(path = %self.store.path().display(), "Unsaved state flushed on exit"),
            Err(e) => error!(path = %self.store.path().display(), error = %e, "Failed to flush state on exit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_drop_flushes_unsaved_changes() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("state.json"));

        {
            let mut guard = StateGuard::open(store.clone()).await.unwrap();
            guard.state_mut().record_alert("k", Utc::now());
            assert!(guard.is_dirty());
        }

        let reloaded = store.load().await.unwrap();
        assert!(reloaded.alert("k").is_some());
    }

    #[tokio::test]
    async fn test_flush_clears_dirty() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("state.json"));

        let mut guard = StateGuard::open(store.clone()).await.unwrap();
        guard.state_mut().record_alert("k", Utc::now());
        guard.flush().await.unwrap();
        assert!(!guard.is_dirty());
        guard.close().await.unwrap();

        assert_eq!(store.load().await.unwrap().alert_count(), 1);
    }

    #[tokio::test]
    async fn test_untouched_guard_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = StateStore::new(tmp.path().join("state.json"));
        drop(StateGuard::open(store.clone()).await.unwrap());
        assert!(!store.path().exists());
    }
}
