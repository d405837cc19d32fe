// SPDX-License-Identifier: MIT OR Apache-2.0

//! Appending one event to a session journal under the two-level lock.

use crate::config::SessionLockConfig;
use crate::lock::acquire_lock;
use crate::sidecar::{load_or_rebuild, persist, SessionStateSidecar};
use crate::types::{normalize_event, JournalEvent, JournalLine};
use gait_error::GaitResult;
use std::path::Path;

/// Appends a new event to `journal_path` and returns the record as
/// written (with its assigned `sequence`).
///
/// # Errors
///
/// Returns [`gait_error::GaitError::LockContention`] if the lock cannot
/// be acquired within the configured timeout, or an I/O error from the
/// journal/sidecar read or write.
pub fn append_event(
    journal_path: &Path,
    profile: &str,
    config: &SessionLockConfig,
    event_type: impl Into<String>,
    payload: serde_json::Value,
    tags: Vec<String>,
    digest: Option<String>,
) -> GaitResult<JournalEvent> {
    let _guard = acquire_lock(journal_path, profile, config)?;

    let state = load_or_rebuild(journal_path)?;
    let mut event = JournalEvent {
        sequence: state.last_sequence + 1,
        event_type: event_type.into(),
        payload,
        tags,
        digest,
    };
    normalize_event(&mut event);

    crate::journal::append_line(journal_path, &JournalLine::Event(event.clone()), config.fsync_every_append)?;

    let journal_size = std::fs::metadata(journal_path).map(|m| m.len()).unwrap_or(state.journal_size_bytes);
    let updated = SessionStateSidecar {
        event_count: state.event_count + 1,
        last_sequence: event.sequence,
        journal_size_bytes: journal_size,
        ..state
    };
    persist(journal_path, &updated)?;

    Ok(event)
}
