//! Persisted plugin state
//!
//! A single JSON document holding the enabled flag. Loading never fails:
//! a missing or unreadable file yields the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// State that survives editor restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginState {
    /// Whether the trigger key runs the previous line
    pub enabled: bool,
}

impl Default for PluginState {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// File-backed store for [`PluginState`]
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the user data directory
    pub fn default_location() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("pycalc").join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, falling back to defaults for anything missing
    pub fn load(&self) -> PluginState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No plugin state at {}: {}", self.path.display(), e);
                return PluginState::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(
                "Ignoring unreadable plugin state at {}: {}",
                self.path.display(),
                e
            );
            PluginState::default()
        })
    }

    pub fn save(&self, state: &PluginState) -> Result<()> {
        let failed = |reason: String| Error::StateSaveFailed {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
        }
        let content = serde_json::to_string(state).map_err(|e| failed(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| failed(e.to_string()))?;
        debug!("Saved plugin state {:?} to {}", state, self.path.display());
        Ok(())
    }
}
