//! Post-run processing utilities.
//!
//! Handles persistence and exports after a session succeeds.

use crate::model::SessionResult;
use crate::storage::{self, ResultStore};
use std::path::PathBuf;

/// What to do with a result once a session succeeds.
#[derive(Debug, Clone, Default)]
pub struct PostRunOptions {
    /// Slot read on startup and, when `save` is set, written on success.
    pub store: Option<ResultStore>,
    pub save: bool,
    pub export_json: Option<PathBuf>,
}

/// Result of post-run processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub saved_path: Option<PathBuf>,
    pub messages: Vec<String>,
}

/// Persist and export a completed result. Failures here never fail the session.
pub(crate) fn process_session_completion(
    opts: &PostRunOptions,
    result: &SessionResult,
) -> ProcessedRun {
    let mut messages = Vec::new();

    let saved_path = match opts.store.as_ref().filter(|_| opts.save) {
        Some(store) => match store.save(result) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "could not save last result");
                messages.push(format!("Save failed: {e:#}"));
                None
            }
        },
        None => None,
    };

    if let Some(export_path) = opts.export_json.as_deref() {
        match storage::export_json(export_path, result) {
            Ok(()) => messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => messages.push(format!("Export JSON failed: {e:#}")),
        }
    }

    ProcessedRun {
        saved_path,
        messages,
    }
}
