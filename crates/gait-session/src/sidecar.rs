// SPDX-License-Identifier: MIT OR Apache-2.0

//! `<journal>.state.json`: a cache of journal counters, rebuilt by
//! rescanning the journal whenever it's stale relative to the journal's
//! current file size.

use crate::types::JournalLine;
use gait_error::{GaitError, GaitResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Cached counters over a session journal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStateSidecar {
    /// Number of event records seen.
    pub event_count: u64,
    /// `sequence` of the last event seen, 0 if none.
    pub last_sequence: u64,
    /// Number of checkpoint records seen.
    pub checkpoint_count: u64,
    /// `checkpoint_digest` of the last checkpoint seen, empty if none.
    pub last_checkpoint_digest: String,
    /// `sequence_end` of the last checkpoint seen, 0 if none.
    pub last_checkpoint_sequence_end: u64,
    /// Journal file size in bytes as of the last rebuild.
    pub journal_size_bytes: u64,
}

/// Path of the sidecar belonging to `journal_path`.
#[must_use]
pub fn sidecar_path(journal_path: &Path) -> PathBuf {
    let mut os_string = journal_path.as_os_str().to_os_string();
    os_string.push(".state.json");
    PathBuf::from(os_string)
}

/// Loads the sidecar if it is still fresh relative to the journal's
/// current size; otherwise rescans the journal and rewrites it.
///
/// # Errors
///
/// Returns [`GaitError::Io`] on read/write failure and
/// [`GaitError::InvalidInput`] if the journal contains a malformed line.
pub fn load_or_rebuild(journal_path: &Path) -> GaitResult<SessionStateSidecar> {
    let journal_size = fs::metadata(journal_path).map(|m| m.len()).unwrap_or(0);
    let sidecar_file = sidecar_path(journal_path);

    if let Ok(bytes) = fs::read(&sidecar_file) {
        if let Ok(cached) = serde_json::from_slice::<SessionStateSidecar>(&bytes) {
            if cached.journal_size_bytes == journal_size {
                return Ok(cached);
            }
        }
    }

    let rebuilt = rebuild(journal_path)?;
    persist(journal_path, &rebuilt)?;
    Ok(rebuilt)
}

/// Rescans the journal from scratch, ignoring any existing sidecar.
///
/// # Errors
///
/// Returns [`GaitError::Io`] if the journal cannot be read and
/// [`GaitError::InvalidInput`] if a line fails to parse.
pub fn rebuild(journal_path: &Path) -> GaitResult<SessionStateSidecar> {
    let journal_size = match fs::metadata(journal_path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SessionStateSidecar::default());
        }
        Err(e) => return Err(GaitError::from(e)),
    };

    let text = fs::read_to_string(journal_path).map_err(GaitError::from)?;
    let mut state = SessionStateSidecar {
        journal_size_bytes: journal_size,
        ..Default::default()
    };

    for (line_no, line) in text.lines().filter(|l| !l.is_empty()).enumerate() {
        let parsed: JournalLine = serde_json::from_str(line).map_err(|e| GaitError::InvalidInput {
            message: format!("malformed journal line {line_no}: {e}"),
        })?;
        match parsed {
            JournalLine::Header(_) => {}
            JournalLine::Event(event) => {
                state.event_count += 1;
                state.last_sequence = event.sequence;
            }
            JournalLine::Checkpoint(checkpoint) => {
                state.checkpoint_count += 1;
                state.last_checkpoint_digest = checkpoint.checkpoint_digest;
                state.last_checkpoint_sequence_end = checkpoint.sequence_end;
            }
        }
    }

    Ok(state)
}

/// Writes `state` to `<journal_path>.state.json`.
///
/// # Errors
///
/// Returns [`GaitError::Io`] on write failure.
pub fn persist(journal_path: &Path, state: &SessionStateSidecar) -> GaitResult<()> {
    let bytes = serde_json::to_vec(state).map_err(|e| GaitError::InvalidInput {
        message: format!("failed to encode session sidecar: {e}"),
    })?;
    fs::write(sidecar_path(journal_path), bytes).map_err(GaitError::from)
}
