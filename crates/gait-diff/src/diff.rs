// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structural diffing of two parsed runpacks.

use crate::types::{DiffPrivacy, KeyedDiff, RunpackDiff};
use gait_error::GaitResult;
use gait_runpack::{Intent, ReadRunpack, Refs, RunpackManifest, ToolResult};
use std::collections::BTreeMap;

/// Reduces a manifest to the fields that are not run-scoped identity:
/// `run_id`, `producer_version`, `created_at`, `manifest_digest`,
/// `signatures`, and per-file hashes are all dropped before digesting.
fn normalized_manifest_value(manifest: &RunpackManifest) -> serde_json::Value {
    serde_json::json!({
        "schema_id": manifest.schema_id,
        "schema_version": manifest.schema_version,
        "capture_mode": manifest.capture_mode,
    })
}

fn digest_value(value: &serde_json::Value) -> GaitResult<String> {
    let bytes = gait_canon::to_canonical_bytes(value)?;
    Ok(gait_canon::sha256_hex(&bytes))
}

fn manifest_changed(left: &RunpackManifest, right: &RunpackManifest) -> GaitResult<bool> {
    let left_digest = digest_value(&normalized_manifest_value(left))?;
    let right_digest = digest_value(&normalized_manifest_value(right))?;
    Ok(left_digest != right_digest)
}

fn intent_digest(intent: &Intent, privacy: DiffPrivacy) -> GaitResult<String> {
    let value = match privacy {
        DiffPrivacy::Full => serde_json::json!({
            "intent_id": intent.intent_id,
            "tool": intent.tool,
            "args": intent.args,
        }),
        DiffPrivacy::Metadata => serde_json::json!({
            "intent_id": intent.intent_id,
            "tool": intent.tool,
        }),
    };
    digest_value(&value)
}

fn result_digest(result: &ToolResult, privacy: DiffPrivacy) -> GaitResult<String> {
    let value = match privacy {
        DiffPrivacy::Full => serde_json::json!({
            "intent_id": result.intent_id,
            "status": result.status,
            "result": result.result,
        }),
        DiffPrivacy::Metadata => serde_json::json!({
            "intent_id": result.intent_id,
            "status": result.status,
        }),
    };
    digest_value(&value)
}

fn diff_keyed<T>(
    left: &[T],
    right: &[T],
    key: impl Fn(&T) -> &str,
    digest: impl Fn(&T) -> GaitResult<String>,
) -> GaitResult<KeyedDiff> {
    let left_by_id: BTreeMap<&str, &T> = left.iter().map(|item| (key(item), item)).collect();
    let right_by_id: BTreeMap<&str, &T> = right.iter().map(|item| (key(item), item)).collect();

    let mut left_only = Vec::new();
    let mut right_only = Vec::new();
    let mut changed = Vec::new();

    for (id, left_item) in &left_by_id {
        match right_by_id.get(id) {
            None => left_only.push((*id).to_string()),
            Some(right_item) => {
                if digest(left_item)? != digest(right_item)? {
                    changed.push((*id).to_string());
                }
            }
        }
    }
    for id in right_by_id.keys() {
        if !left_by_id.contains_key(id) {
            right_only.push((*id).to_string());
        }
    }

    Ok(KeyedDiff {
        left_only,
        right_only,
        changed,
    })
}

fn refs_changed(left: &Refs, right: &Refs, privacy: DiffPrivacy) -> GaitResult<bool> {
    match privacy {
        DiffPrivacy::Full => {
            let left_digest = digest_value(&serde_json::to_value(left).map_err(|e| {
                gait_error::GaitError::InvalidInput {
                    message: format!("failed to encode refs: {e}"),
                }
            })?)?;
            let right_digest = digest_value(&serde_json::to_value(right).map_err(|e| {
                gait_error::GaitError::InvalidInput {
                    message: format!("failed to encode refs: {e}"),
                }
            })?)?;
            Ok(left_digest != right_digest)
        }
        DiffPrivacy::Metadata => Ok(left.entries.len() != right.entries.len()),
    }
}

/// Diffs two parsed runpacks under the given privacy mode.
///
/// # Errors
///
/// Returns an error if a manifest, intent, result, or refs value fails to
/// canonicalize.
pub fn diff_runpacks(
    left: &ReadRunpack,
    right: &ReadRunpack,
    privacy: DiffPrivacy,
) -> GaitResult<RunpackDiff> {
    let manifest_changed = manifest_changed(&left.manifest, &right.manifest)?;
    let intents = diff_keyed(
        &left.intents,
        &right.intents,
        |i| i.intent_id.as_str(),
        |i| intent_digest(i, privacy),
    )?;
    let results = diff_keyed(
        &left.results,
        &right.results,
        |r| r.intent_id.as_str(),
        |r| result_digest(r, privacy),
    )?;
    let refs_changed = refs_changed(&left.refs, &right.refs, privacy)?;

    Ok(RunpackDiff {
        manifest_changed,
        intents,
        results,
        refs_changed,
    })
}
