// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared types for diffing and reducing runpacks.

/// Controls how much of an intent/result body contributes to its digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffPrivacy {
    /// Digest over the full body, including tool args and result payloads.
    Full,
    /// Digest over identity fields only (`intent_id`, `tool`, `status`);
    /// args and result bodies are excluded.
    Metadata,
}

/// A predicate used by [`crate::reduce::reduce_to_minimal_failing_example`]
/// to pick the intent to retain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducePredicate {
    /// The intent has no corresponding result.
    MissingResult,
    /// The intent has a result whose status is not `"ok"`.
    NonOkStatus,
}

/// The set difference and modification report for one keyed collection
/// (intents or results), keyed by `intent_id`.
#[derive(Debug, Clone, Default)]
pub struct KeyedDiff {
    /// Ids present only on the left side.
    pub left_only: Vec<String>,
    /// Ids present only on the right side.
    pub right_only: Vec<String>,
    /// Ids present on both sides whose digest differs.
    pub changed: Vec<String>,
}

/// Result of [`crate::diff::diff_runpacks`].
#[derive(Debug, Clone)]
pub struct RunpackDiff {
    /// `true` if the normalized manifests digest differently.
    pub manifest_changed: bool,
    /// Diff over `intents.jsonl`, keyed by `intent_id`.
    pub intents: KeyedDiff,
    /// Diff over `results.jsonl`, keyed by `intent_id`.
    pub results: KeyedDiff,
    /// `true` if `refs.json` differs under the chosen privacy mode.
    pub refs_changed: bool,
}
