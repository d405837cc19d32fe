// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runpack record shapes.

use chrono::{DateTime, Utc};
use gait_core::{CaptureMode, ContextEvidenceMode, FileHashEntry, ManifestSignature, RunId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunpackManifest {
    /// Fixed to `"gait.runpack.manifest"`.
    pub schema_id: String,
    /// Fixed to `"1.0.0"` for this revision.
    pub schema_version: String,
    /// When the runpack was built, in UTC.
    pub created_at: DateTime<Utc>,
    /// Version string of the producing binary.
    pub producer_version: String,
    /// Identifier of the recorded run.
    pub run_id: RunId,
    /// Whether tool payloads are stored inline (`raw`) or by reference.
    pub capture_mode: CaptureMode,
    /// Per-file content hashes, sorted by path.
    pub files: Vec<FileHashEntry>,
    /// Digest of this manifest with `manifest_digest` and `signatures`
    /// cleared.
    pub manifest_digest: String,
    /// Ed25519 signatures over the canonical, cleared manifest bytes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<ManifestSignature>,
}

impl RunpackManifest {
    /// Returns a copy with `manifest_digest` and `signatures` cleared, as
    /// required before (re)computing the digest.
    #[must_use]
    pub fn cleared_for_digest(&self) -> Self {
        Self {
            manifest_digest: String::new(),
            signatures: Vec::new(),
            ..self.clone()
        }
    }
}

/// One timeline entry in `run.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Monotonic sequence number within the run.
    pub seq: u64,
    /// Short event kind label.
    pub kind: String,
    /// Intent id this event relates to, or empty if it is run-scoped.
    #[serde(rename = "ref", default)]
    pub ref_id: String,
    /// Event-specific payload.
    #[serde(default)]
    pub payload: Value,
}

/// `run.json`: run identity, environment fingerprint, and event timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Identifier of the recorded run.
    pub run_id: RunId,
    /// Free-form environment fingerprint (os, tool versions, etc.).
    #[serde(default)]
    pub environment: Value,
    /// Ordered timeline of run-level events.
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
}

/// One line of `intents.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// Identifier joining this intent to its result.
    pub intent_id: String,
    /// Tool name the agent invoked.
    pub tool: String,
    /// Tool call arguments.
    #[serde(default)]
    pub args: Value,
}

/// One line of `results.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Joins to [`Intent::intent_id`].
    pub intent_id: String,
    /// `"ok"` or `"error"`.
    pub status: String,
    /// Tool call result payload.
    #[serde(default)]
    pub result: Value,
}

/// One entry in `refs.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefEntry {
    /// Identifier this ref is keyed by (an intent id or a ref-only id).
    pub id: String,
    /// Content digest of the referenced context.
    pub digest: String,
}

/// `refs.json`: retrieval/context receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refs {
    /// Digest over the full context set, when applicable.
    #[serde(default)]
    pub context_set_digest: String,
    /// Whether `context_set_digest` is mandatory for this run.
    pub context_evidence_mode: ContextEvidenceMode,
    /// Individual context receipts.
    #[serde(default)]
    pub entries: Vec<RefEntry>,
}

/// File names used within every runpack archive.
pub mod paths {
    /// `manifest.json`.
    pub const MANIFEST: &str = "manifest.json";
    /// `run.json`.
    pub const RUN: &str = "run.json";
    /// `intents.jsonl`.
    pub const INTENTS: &str = "intents.jsonl";
    /// `results.jsonl`.
    pub const RESULTS: &str = "results.jsonl";
    /// `refs.json`.
    pub const REFS: &str = "refs.json";
}
