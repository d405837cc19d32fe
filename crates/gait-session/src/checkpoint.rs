// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checkpoint emission: materializes the events since the last checkpoint
//! into a runpack and appends a linking checkpoint record.

use crate::config::SessionLockConfig;
use crate::lock::acquire_lock;
use crate::sidecar::{load_or_rebuild, persist, SessionStateSidecar};
use crate::types::{checkpoint_digest, JournalCheckpoint, JournalEvent, JournalLine};
use ed25519_dalek::SigningKey;
use gait_core::{ContextEvidenceMode, RunId};
use gait_error::{GaitError, GaitResult};
use gait_runpack::{Intent, Refs, RunpackBuilder, ToolResult};
use std::path::Path;

/// Result of a successful [`emit_checkpoint`] call.
#[derive(Debug, Clone)]
pub struct CheckpointOutcome {
    /// The newly appended checkpoint.
    pub checkpoint: JournalCheckpoint,
    /// Every checkpoint in the journal, including the new one, in order.
    pub chain: Vec<JournalCheckpoint>,
}

/// Maps a policy verdict recorded on an event's payload to a synthetic
/// tool-result status. Events without a `verdict` field default to `"ok"`.
fn status_for_verdict(payload: &serde_json::Value) -> &'static str {
    match payload.get("verdict").and_then(serde_json::Value::as_str) {
        Some("allow") => "ok",
        Some("block" | "require_approval") => "error",
        _ => "ok",
    }
}

fn synthetic_intent_result(event: &JournalEvent) -> (Intent, ToolResult) {
    let intent_id = format!("cp_event_{}", event.sequence);
    let intent = Intent {
        intent_id: intent_id.clone(),
        tool: event.event_type.clone(),
        args: event.payload.clone(),
    };
    let status = status_for_verdict(&event.payload);
    let result_payload = serde_json::json!({ "event": event.payload, "tags": event.tags });
    let result = ToolResult {
        intent_id,
        status: status.to_string(),
        result: result_payload,
    };
    (intent, result)
}

/// Emits a checkpoint covering every event since the last one, writing
/// the materialized runpack to `runpack_path`.
///
/// # Errors
///
/// Returns [`GaitError::InvalidInput`] if there are no new events to
/// cover, [`GaitError::LockContention`] on lock timeout, or an error
/// from runpack construction / journal I/O.
#[allow(clippy::too_many_arguments)]
pub fn emit_checkpoint(
    journal_path: &Path,
    profile: &str,
    config: &SessionLockConfig,
    session_run_id: &str,
    created_at: chrono::DateTime<chrono::Utc>,
    runpack_path: &Path,
    producer_version: impl Into<String>,
    signing_key: Option<SigningKey>,
) -> GaitResult<CheckpointOutcome> {
    let _span = tracing::info_span!(
        "gait_session.emit_checkpoint",
        run_id = session_run_id,
        journal_path = %journal_path.display()
    )
    .entered();

    let _guard = acquire_lock(journal_path, profile, config)?;

    let state = load_or_rebuild(journal_path)?;
    let read = crate::journal::read_journal(journal_path)?;

    let new_events: Vec<&JournalEvent> = read
        .events
        .iter()
        .filter(|e| e.sequence > state.last_checkpoint_sequence_end)
        .collect();
    if new_events.is_empty() {
        return Err(GaitError::InvalidInput {
            message: "no new events to checkpoint".to_string(),
        });
    }

    let checkpoint_index = state.checkpoint_count;
    let sequence_start = new_events.first().unwrap().sequence;
    let sequence_end = new_events.last().unwrap().sequence;

    let run_id = RunId::new(format!("{session_run_id}_cp_{checkpoint_index:04}"))?;
    let mut builder = RunpackBuilder::new(run_id, created_at)
        .producer_version(producer_version)
        .refs(Refs {
            context_set_digest: String::new(),
            context_evidence_mode: ContextEvidenceMode::BestEffort,
            entries: Vec::new(),
        });
    for event in &new_events {
        let (intent, result) = synthetic_intent_result(event);
        builder = builder.add_intent(intent).add_result(result);
    }
    if let Some(signing_key) = signing_key {
        builder = builder.sign_with(signing_key);
    }
    let built = builder.build()?;
    std::fs::write(runpack_path, &built.bytes).map_err(GaitError::from)?;

    let prev_checkpoint_digest = state.last_checkpoint_digest.clone();
    let digest = checkpoint_digest(
        &built.manifest.manifest_digest,
        &prev_checkpoint_digest,
        checkpoint_index,
        sequence_start,
        sequence_end,
    );

    let checkpoint = JournalCheckpoint {
        checkpoint_index,
        sequence_start,
        sequence_end,
        manifest_digest: built.manifest.manifest_digest,
        prev_checkpoint_digest,
        checkpoint_digest: digest,
        runpack_path: runpack_path.display().to_string(),
    };

    crate::journal::append_line(
        journal_path,
        &JournalLine::Checkpoint(checkpoint.clone()),
        config.fsync_every_append,
    )?;

    let journal_size = std::fs::metadata(journal_path).map(|m| m.len()).unwrap_or(state.journal_size_bytes);
    let updated = SessionStateSidecar {
        checkpoint_count: state.checkpoint_count + 1,
        last_checkpoint_digest: checkpoint.checkpoint_digest.clone(),
        last_checkpoint_sequence_end: checkpoint.sequence_end,
        journal_size_bytes: journal_size,
        ..state
    };
    persist(journal_path, &updated)?;

    let mut chain = read.checkpoints;
    chain.push(checkpoint.clone());

    tracing::debug!(
        target: "gait.session",
        run_id = session_run_id,
        checkpoint_index,
        sequence_start,
        sequence_end,
        "emitted checkpoint"
    );

    Ok(CheckpointOutcome { checkpoint, chain })
}
