// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Session: an append-only journal recording one long-running agent
//! session, with periodic checkpoints that materialize covered events
//! into a runpack and chain-link them by digest.

mod append;
mod checkpoint;
mod compact;
mod config;
mod journal;
mod lock;
mod sidecar;
mod types;
mod verify;

pub use append::append_event;
pub use checkpoint::{emit_checkpoint, CheckpointOutcome};
pub use compact::{compact_journal, CompactionReport};
pub use config::{ConfigWarning, LockProfile, SessionLockConfig, WarningSeverity};
pub use journal::{append_line, read_journal, ReadJournal};
pub use lock::{acquire_lock, SessionLockGuard};
pub use sidecar::{load_or_rebuild, sidecar_path, SessionStateSidecar};
pub use types::{
    checkpoint_digest, normalize_event, JournalCheckpoint, JournalEvent, JournalHeader, JournalLine,
    SCHEMA_ID, SCHEMA_VERSION,
};
pub use verify::{verify_chain, SessionChainReport};

use gait_error::GaitResult;
use std::path::Path;

/// Writes the header line of a brand-new journal.
///
/// # Errors
///
/// Returns an I/O error if the journal already exists or cannot be
/// created.
pub fn start_session(
    journal_path: &Path,
    session_id: impl Into<String>,
    run_id: impl Into<String>,
    created_at: chrono::DateTime<chrono::Utc>,
) -> GaitResult<JournalHeader> {
    if journal_path.exists() {
        return Err(gait_error::GaitError::InvalidInput {
            message: format!("journal already exists at {}", journal_path.display()),
        });
    }
    let header = JournalHeader {
        schema_id: SCHEMA_ID.to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        session_id: session_id.into(),
        run_id: run_id.into(),
        created_at,
    };
    append_line(journal_path, &JournalLine::Header(header.clone()), true)?;
    Ok(header)
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn created_at() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn append_then_checkpoint_then_verify_chain_is_clean() {
        let dir = tempdir().unwrap();
        let journal_path = dir.path().join("session.jsonl");
        let config = SessionLockConfig::standard();

        start_session(&journal_path, "session_1", "run_1", created_at()).unwrap();
        append_event(
            &journal_path,
            "standard",
            &config,
            "tool.call",
            serde_json::json!({"tool": "echo"}),
            vec!["turn:1".to_string()],
            None,
        )
        .unwrap();
        append_event(
            &journal_path,
            "standard",
            &config,
            "policy.decision",
            serde_json::json!({"verdict": "allow"}),
            Vec::new(),
            None,
        )
        .unwrap();

        let runpack_path = dir.path().join("checkpoint_0000.zip");
        let outcome = emit_checkpoint(
            &journal_path,
            "standard",
            &config,
            "run_1",
            created_at(),
            &runpack_path,
            "0.0.0-dev",
            None,
        )
        .unwrap();
        assert_eq!(outcome.checkpoint.sequence_start, 1);
        assert_eq!(outcome.checkpoint.sequence_end, 2);
        assert_eq!(outcome.chain.len(), 1);

        let report = verify_chain(&journal_path, &gait_runpack::RunpackVerifierOptions::default()).unwrap();
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn emitting_a_checkpoint_with_no_new_events_fails() {
        let dir = tempdir().unwrap();
        let journal_path = dir.path().join("session.jsonl");
        let config = SessionLockConfig::standard();
        start_session(&journal_path, "session_1", "run_1", created_at()).unwrap();

        let runpack_path = dir.path().join("checkpoint_0000.zip");
        let result = emit_checkpoint(
            &journal_path,
            "standard",
            &config,
            "run_1",
            created_at(),
            &runpack_path,
            "0.0.0-dev",
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn compaction_drops_only_events_covered_by_a_checkpoint() {
        let dir = tempdir().unwrap();
        let journal_path = dir.path().join("session.jsonl");
        let config = SessionLockConfig::standard();
        start_session(&journal_path, "session_1", "run_1", created_at()).unwrap();
        append_event(&journal_path, "standard", &config, "tool.call", serde_json::json!({}), Vec::new(), None)
            .unwrap();
        append_event(&journal_path, "standard", &config, "tool.call", serde_json::json!({}), Vec::new(), None)
            .unwrap();

        let runpack_path = dir.path().join("checkpoint_0000.zip");
        emit_checkpoint(&journal_path, "standard", &config, "run_1", created_at(), &runpack_path, "0.0.0-dev", None)
            .unwrap();

        append_event(&journal_path, "standard", &config, "tool.call", serde_json::json!({}), Vec::new(), None)
            .unwrap();

        let report = compact_journal(&journal_path, "standard", &config, false).unwrap();
        assert_eq!(report.dropped_event_count, 2);
        assert_eq!(report.retained_event_count, 1);

        let read = read_journal(&journal_path).unwrap();
        assert_eq!(read.events.len(), 1);
        assert_eq!(read.checkpoints.len(), 1);
    }

    #[test]
    fn env_overrides_apply_and_unparseable_values_warn_without_aborting() {
        unsafe { std::env::set_var("GAIT_SESSION_LOCK_TIMEOUT", "9999"); }
        unsafe { std::env::set_var("GAIT_SESSION_LOCK_RETRY", "not-a-number"); }
        let (config, warnings) = SessionLockConfig::standard().apply_env_overrides();
        assert_eq!(config.timeout_ms, 9999);
        assert!(warnings.iter().any(|w| w.field.contains("RETRY")));
        unsafe { std::env::remove_var("GAIT_SESSION_LOCK_TIMEOUT"); }
        unsafe { std::env::remove_var("GAIT_SESSION_LOCK_RETRY"); }
    }
}
