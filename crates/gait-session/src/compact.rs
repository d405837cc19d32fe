// SPDX-License-Identifier: MIT OR Apache-2.0

//! Journal compaction: events already frozen inside a checkpoint's
//! runpack are dropped, and the journal is rewritten as
//! header → all checkpoints → retained events.

use crate::config::SessionLockConfig;
use crate::lock::acquire_lock;
use crate::sidecar::{rebuild, persist};
use crate::types::JournalLine;
use gait_error::GaitResult;
use std::path::Path;

/// Result of [`compact_journal`].
#[derive(Debug, Clone)]
pub struct CompactionReport {
    /// Number of events dropped because a checkpoint already covers them.
    pub dropped_event_count: u64,
    /// Number of events retained.
    pub retained_event_count: u64,
    /// `true` if the journal file was actually rewritten.
    pub rewrote_journal: bool,
}

/// Compacts `journal_path`. When `dry_run` is `true`, computes and
/// returns the would-be result without touching the file.
///
/// # Errors
///
/// Returns [`gait_error::GaitError::LockContention`] on lock timeout, or
/// an I/O error from reading/writing the journal.
pub fn compact_journal(
    journal_path: &Path,
    profile: &str,
    config: &SessionLockConfig,
    dry_run: bool,
) -> GaitResult<CompactionReport> {
    let _guard = acquire_lock(journal_path, profile, config)?;

    let read = crate::journal::read_journal(journal_path)?;
    let covered_through = read.checkpoints.last().map_or(0, |c| c.sequence_end);

    let (dropped, retained): (Vec<_>, Vec<_>) =
        read.events.into_iter().partition(|e| e.sequence <= covered_through);

    let report = CompactionReport {
        dropped_event_count: dropped.len() as u64,
        retained_event_count: retained.len() as u64,
        rewrote_journal: !dry_run && !dropped.is_empty(),
    };

    if dry_run || dropped.is_empty() {
        return Ok(report);
    }

    let mut lines = Vec::with_capacity(1 + read.checkpoints.len() + retained.len());
    lines.push(JournalLine::Header(read.header));
    lines.extend(read.checkpoints.into_iter().map(JournalLine::Checkpoint));
    lines.extend(retained.into_iter().map(JournalLine::Event));

    let mut bytes = Vec::new();
    for line in &lines {
        bytes.extend_from_slice(&serde_json::to_vec(line).map_err(|e| gait_error::GaitError::InvalidInput {
            message: format!("failed to encode journal line during compaction: {e}"),
        })?);
        bytes.push(b'\n');
    }
    std::fs::write(journal_path, bytes).map_err(gait_error::GaitError::from)?;

    let rebuilt = rebuild(journal_path)?;
    persist(journal_path, &rebuilt)?;

    Ok(report)
}
