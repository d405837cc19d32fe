// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reduction of a runpack down to the single intent that triggers a
//! chosen failure predicate.

use crate::types::ReducePredicate;
use ed25519_dalek::SigningKey;
use gait_core::RunId;
use gait_error::{GaitError, GaitResult};
use gait_runpack::{
    read_runpack, BuiltRunpack, Intent, ReadOptions, ReadRunpack, RunpackBuilder, TimelineEvent,
    ToolResult,
};

fn predicate_matches(result: Option<&ToolResult>, predicate: ReducePredicate) -> bool {
    match predicate {
        ReducePredicate::MissingResult => result.is_none(),
        ReducePredicate::NonOkStatus => result.is_some_and(|r| r.status != "ok"),
    }
}

fn select_intent<'a>(read: &'a ReadRunpack, predicate: ReducePredicate) -> Option<&'a Intent> {
    let mut candidates: Vec<&Intent> = read
        .intents
        .iter()
        .filter(|intent| predicate_matches(read.result_for(&intent.intent_id), predicate))
        .collect();
    candidates.sort_by(|a, b| a.intent_id.cmp(&b.intent_id));
    candidates.into_iter().next()
}

/// Reduces `read` to the smallest runpack (by intent id) that still
/// triggers `predicate`, rereads the built archive, and confirms the
/// predicate still holds before returning.
///
/// # Errors
///
/// Returns [`GaitError::InvalidInput`] if no intent triggers the
/// predicate, or an error from rebuilding/rereading the runpack.
pub fn reduce_to_minimal_failing_example(
    read: &ReadRunpack,
    predicate: ReducePredicate,
    producer_version: impl Into<String>,
    signing_key: Option<SigningKey>,
) -> GaitResult<BuiltRunpack> {
    let selected = select_intent(read, predicate).ok_or_else(|| GaitError::InvalidInput {
        message: "no intent in this runpack triggers the given predicate".to_string(),
    })?;
    let selected_id = selected.intent_id.clone();

    let run_id = RunId::new(format!("{}_reduced", read.manifest.run_id.as_str()))?;
    let mut run_metadata = read.run_metadata.clone();
    run_metadata.run_id = run_id.clone();
    run_metadata.timeline.retain(|event: &TimelineEvent| {
        event.ref_id.is_empty() || event.ref_id == selected_id
    });

    let mut refs = read.refs.clone();
    refs.entries.retain(|entry| entry.id == selected_id);

    let mut builder = RunpackBuilder::new(run_id, read.manifest.created_at)
        .producer_version(producer_version)
        .capture_mode(read.manifest.capture_mode)
        .run_metadata(run_metadata)
        .refs(refs)
        .add_intent(selected.clone());

    if !matches!(predicate, ReducePredicate::MissingResult) {
        if let Some(result) = read.result_for(&selected_id) {
            builder = builder.add_result(result.clone());
        }
    }
    if let Some(signing_key) = signing_key {
        builder = builder.sign_with(signing_key);
    }

    let built = builder.build()?;

    let reread = read_runpack(&built.bytes, &ReadOptions::default())?;
    let still_matches = reread
        .intents
        .iter()
        .any(|intent| intent.intent_id == selected_id)
        && predicate_matches(reread.result_for(&selected_id), predicate);
    if !still_matches {
        return Err(GaitError::verification(
            "reduced runpack no longer triggers the selected predicate",
        ));
    }

    Ok(built)
}
