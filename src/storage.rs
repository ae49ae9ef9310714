//! Single-slot persistence for the most recent successful result.

use crate::model::SessionResult;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

const APP_DIR: &str = "vidgen";
const LAST_RESULT_FILE: &str = "last_result.json";

/// Default location of the last-result file under the platform data directory.
pub fn default_store_path() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .context("could not determine a data directory")?;
    Ok(base.join(APP_DIR).join(LAST_RESULT_FILE))
}

#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `path` if given, otherwise at the default location.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Ok(Self::new(p)),
            None => Ok(Self::new(default_store_path()?)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the slot with `result`.
    pub fn save(&self, result: &SessionResult) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let data = serde_json::to_vec_pretty(result)?;
        // Write-then-rename so a crash never leaves a half-written slot.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename to {}", self.path.display()))?;
        Ok(self.path.clone())
    }

    /// The stored result if it exists, parses, and is younger than 24 hours at `now`.
    ///
    /// A missing, unreadable, or corrupt slot counts as "no prior result"; it is
    /// never reported as an error.
    pub fn load_recent(&self, now: OffsetDateTime) -> Option<SessionResult> {
        let data = match std::fs::read(&self.path) {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "no stored result");
                return None;
            }
        };
        let result: SessionResult = match serde_json::from_slice(&data) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "ignoring malformed stored result");
                return None;
            }
        };
        if !result.is_fresh_at(now) {
            tracing::debug!(timestamp = result.timestamp, "stored result expired");
            return None;
        }
        Some(result)
    }
}

/// Write a result as pretty JSON to a user-chosen path.
pub fn export_json(path: &Path, result: &SessionResult) -> Result<()> {
    let data = serde_json::to_string_pretty(result)?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
