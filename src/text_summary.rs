//! Text rendering for CLI output.
//!
//! This module formats the result panel and status lines for text mode.

use crate::model::{SessionResult, StatusEntry};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::UtcOffset;

const CLOCK: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build the result panel: video, echo of the request fields, download link.
pub(crate) fn build_text_summary(result: &SessionResult) -> TextSummary {
    let lines = vec![
        format!("Video:      {}", result.video_url),
        format!("Prompt:     {}", result.prompt),
        format!("Duration:   {} seconds", result.duration),
        format!("Resolution: {}", result.resolution),
        format!("Style:      {}", result.style.label()),
        format!("Download:   {}", result.download_url()),
    ];
    TextSummary { lines }
}

/// One status log line, stamped with local wall-clock time when available.
pub(crate) fn format_status_line(entry: &StatusEntry) -> String {
    let at = match UtcOffset::current_local_offset() {
        Ok(offset) => entry.at.to_offset(offset),
        Err(_) => entry.at,
    };
    let clock = at.format(CLOCK).unwrap_or_else(|_| "--:--:--".into());
    format!("[{clock}] {}", entry.message)
}
