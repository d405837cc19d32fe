// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record shapes making up one line of an append-only session journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed schema identifier for a journal's header record.
pub const SCHEMA_ID: &str = "gait.session.journal";
/// Fixed schema version for a journal's header record.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// The first line of every journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalHeader {
    /// Fixed to [`SCHEMA_ID`].
    pub schema_id: String,
    /// Fixed to [`SCHEMA_VERSION`].
    pub schema_version: String,
    /// Identifier of the session this journal belongs to.
    pub session_id: String,
    /// Identifier of the run this session accumulates evidence for.
    pub run_id: String,
    /// When the session started.
    pub created_at: DateTime<Utc>,
}

/// One append to the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEvent {
    /// Monotonically increasing, starting at 1.
    pub sequence: u64,
    /// Caller-supplied event type, e.g. `"tool.call"`, `"policy.decision"`.
    pub event_type: String,
    /// Event body.
    pub payload: serde_json::Value,
    /// Deduplicated, sorted free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Lowercased content digest of `payload`, if the caller supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// A checkpoint covering a contiguous, previously-uncovered range of
/// events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalCheckpoint {
    /// Gap-free, starting at 0.
    pub checkpoint_index: u64,
    /// First covered event sequence (inclusive).
    pub sequence_start: u64,
    /// Last covered event sequence (inclusive).
    pub sequence_end: u64,
    /// `manifest_digest` of the runpack materializing this checkpoint.
    pub manifest_digest: String,
    /// `checkpoint_digest` of the previous checkpoint; empty for the first.
    pub prev_checkpoint_digest: String,
    /// `SHA256(manifest_digest | prev_checkpoint_digest | checkpoint_index | sequence_start | sequence_end)`.
    pub checkpoint_digest: String,
    /// Filesystem path of the materialized runpack.
    pub runpack_path: String,
}

/// One physical line of the journal file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum JournalLine {
    /// The header record.
    Header(JournalHeader),
    /// An event record.
    Event(JournalEvent),
    /// A checkpoint record.
    Checkpoint(JournalCheckpoint),
}

/// Computes `checkpoint_digest` for the given fields.
#[must_use]
pub fn checkpoint_digest(
    manifest_digest: &str,
    prev_checkpoint_digest: &str,
    checkpoint_index: u64,
    sequence_start: u64,
    sequence_end: u64,
) -> String {
    let material = format!(
        "{manifest_digest}|{prev_checkpoint_digest}|{checkpoint_index}|{sequence_start}|{sequence_end}"
    );
    gait_canon::sha256_hex(material.as_bytes())
}

/// Normalizes an event's tags (dedup, sort) and lowercases its digest, if
/// any, in place.
pub fn normalize_event(event: &mut JournalEvent) {
    event.tags.sort();
    event.tags.dedup();
    if let Some(digest) = event.digest.take() {
        event.digest = Some(digest.to_ascii_lowercase());
    }
}
