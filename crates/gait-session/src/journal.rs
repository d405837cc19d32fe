// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level journal line I/O and fail-fast structural reading.

use crate::types::{checkpoint_digest, JournalCheckpoint, JournalEvent, JournalHeader, JournalLine};
use gait_error::{GaitError, GaitResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Appends one line to the journal, creating it if absent.
///
/// # Errors
///
/// Returns [`GaitError::Io`] on any filesystem failure.
pub fn append_line(journal_path: &Path, line: &JournalLine, fsync: bool) -> GaitResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(journal_path)
        .map_err(GaitError::from)?;
    let mut bytes = serde_json::to_vec(line).map_err(|e| GaitError::InvalidInput {
        message: format!("failed to encode journal line: {e}"),
    })?;
    bytes.push(b'\n');
    file.write_all(&bytes).map_err(GaitError::from)?;
    if fsync {
        file.sync_all().map_err(GaitError::from)?;
    }
    Ok(())
}

/// A fully parsed, structurally validated journal.
#[derive(Debug, Clone)]
pub struct ReadJournal {
    /// The single header record.
    pub header: JournalHeader,
    /// Event records in file order.
    pub events: Vec<JournalEvent>,
    /// Checkpoint records in file order.
    pub checkpoints: Vec<JournalCheckpoint>,
}

/// Reads and structurally validates a journal: exactly one header first,
/// events with a strictly monotonic `sequence` starting at 1, and
/// checkpoints with gap-free `checkpoint_index` whose `sequence_start`
/// exceeds the previous checkpoint's `sequence_end` and whose
/// `checkpoint_digest` recomputes correctly.
///
/// # Errors
///
/// Returns [`GaitError::VerificationFailed`] on the first structural
/// violation, or [`GaitError::Io`] / [`GaitError::InvalidInput`] for
/// filesystem or parse failures.
pub fn read_journal(journal_path: &Path) -> GaitResult<ReadJournal> {
    let text = std::fs::read_to_string(journal_path).map_err(GaitError::from)?;
    let mut lines = text.lines().filter(|l| !l.is_empty());

    let header_line = lines.next().ok_or_else(|| GaitError::MissingField {
        field: "journal header".to_string(),
    })?;
    let header = match parse_line(header_line)? {
        JournalLine::Header(header) => header,
        _ => {
            return Err(GaitError::verification("first journal line is not a header record"));
        }
    };

    let mut events = Vec::new();
    let mut checkpoints: Vec<JournalCheckpoint> = Vec::new();
    let mut last_sequence: u64 = 0;

    for line in lines {
        match parse_line(line)? {
            JournalLine::Header(_) => {
                return Err(GaitError::verification("more than one header record in journal"));
            }
            JournalLine::Event(event) => {
                if event.sequence != last_sequence + 1 {
                    return Err(GaitError::verification(format!(
                        "event sequence {} is not strictly monotonic after {last_sequence}",
                        event.sequence
                    )));
                }
                last_sequence = event.sequence;
                events.push(event);
            }
            JournalLine::Checkpoint(checkpoint) => {
                let expected_index = checkpoints.last().map_or(0, |c| c.checkpoint_index + 1);
                if checkpoint.checkpoint_index != expected_index {
                    return Err(GaitError::verification(format!(
                        "checkpoint_index {} is not gap-free after {expected_index}",
                        checkpoint.checkpoint_index
                    )));
                }
                let previous_sequence_end = checkpoints.last().map_or(0, |c| c.sequence_end);
                if checkpoint.sequence_start <= previous_sequence_end {
                    return Err(GaitError::verification(format!(
                        "checkpoint {} sequence_start {} does not exceed previous sequence_end {previous_sequence_end}",
                        checkpoint.checkpoint_index, checkpoint.sequence_start
                    )));
                }
                let previous_digest = checkpoints.last().map_or(String::new(), |c| c.checkpoint_digest.clone());
                if checkpoint.prev_checkpoint_digest != previous_digest {
                    return Err(GaitError::verification(format!(
                        "checkpoint {} prev_checkpoint_digest does not match the previous checkpoint",
                        checkpoint.checkpoint_index
                    )));
                }
                let recomputed = checkpoint_digest(
                    &checkpoint.manifest_digest,
                    &checkpoint.prev_checkpoint_digest,
                    checkpoint.checkpoint_index,
                    checkpoint.sequence_start,
                    checkpoint.sequence_end,
                );
                if recomputed != checkpoint.checkpoint_digest {
                    return Err(GaitError::verification(format!(
                        "checkpoint {} checkpoint_digest does not recompute",
                        checkpoint.checkpoint_index
                    )));
                }
                checkpoints.push(checkpoint);
            }
        }
    }

    Ok(ReadJournal { header, events, checkpoints })
}

fn parse_line(line: &str) -> GaitResult<JournalLine> {
    serde_json::from_str(line).map_err(|e| GaitError::InvalidInput {
        message: format!("malformed journal line: {e}"),
    })
}
