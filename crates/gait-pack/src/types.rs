// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outer pack record shapes, shared across the `run`, `job`, and `call`
//! variants.

use chrono::{DateTime, Utc};
use gait_core::ManifestSignature;
use serde::{Deserialize, Serialize};

/// The three pack variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackType {
    /// Wraps a runpack.
    Run,
    /// Records job-runtime state.
    Job,
    /// Wraps a voice call.
    Call,
}

/// The content type of one pack entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// A single canonical JSON object.
    Json,
    /// Newline-delimited canonical JSON.
    Jsonl,
    /// A nested zip archive (an embedded runpack).
    Zip,
    /// Opaque bytes.
    Blob,
}

/// One entry in `pack_manifest.json`'s `contents[]` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackContentEntry {
    /// Archive-relative path.
    pub path: String,
    /// SHA-256 of the entry's bytes.
    pub sha256: String,
    /// Entry content type.
    #[serde(rename = "type")]
    pub content_type: ContentType,
}

/// `pack_manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackManifest {
    /// Fixed to `"gait.pack.manifest"`.
    pub schema_id: String,
    /// Fixed to `"1.0.0"`.
    pub schema_version: String,
    /// Fixed to the deterministic epoch.
    pub created_at: DateTime<Utc>,
    /// Version string of the producing binary.
    pub producer_version: String,
    /// Content-addressed identifier of this pack.
    pub pack_id: String,
    /// Which variant this pack wraps.
    pub pack_type: PackType,
    /// Identifier or path of the source artifact this pack wraps.
    pub source_ref: String,
    /// Every file in the pack except the manifest itself, sorted by path.
    pub contents: Vec<PackContentEntry>,
    /// Ed25519 signatures over the canonical, cleared manifest bytes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<ManifestSignature>,
}

impl PackManifest {
    /// Returns a copy with `pack_id` and `signatures` cleared, as required
    /// before (re)computing the digest.
    #[must_use]
    pub fn cleared_for_digest(&self) -> Self {
        Self {
            pack_id: String::new(),
            signatures: Vec::new(),
            ..self.clone()
        }
    }
}

/// Chain-linkage fields of one `proof_records.jsonl` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofIntegrity {
    /// `record_hash` of the previous record, empty for the first record.
    #[serde(default)]
    pub previous_record_hash: String,
    /// Digest of this record with `record_hash`/`signature` cleared.
    pub record_hash: String,
    /// Key id used to sign `record_hash`, if signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key_id: Option<String>,
    /// Hex-encoded Ed25519 signature over `record_hash`'s bytes, if signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// One line of `proof_records.jsonl`: a chained attestation over one
/// non-proof pack entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofRecord {
    /// Path of the attested entry.
    pub path: String,
    /// SHA-256 of the attested entry's bytes.
    pub sha256: String,
    /// Content type of the attested entry.
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Chain linkage for this record.
    pub integrity: ProofIntegrity,
}

impl ProofRecord {
    /// Returns a copy with `integrity.record_hash`/`integrity.signature`
    /// cleared, as required before (re)computing `record_hash`.
    #[must_use]
    pub fn cleared_for_digest(&self) -> Self {
        Self {
            integrity: ProofIntegrity {
                record_hash: String::new(),
                signature: None,
                ..self.integrity.clone()
            },
            ..self.clone()
        }
    }
}

/// Path constants shared by every pack variant.
pub mod paths {
    /// `pack_manifest.json`.
    pub const PACK_MANIFEST: &str = "pack_manifest.json";
    /// `proof_records.jsonl`.
    pub const PROOF_RECORDS: &str = "proof_records.jsonl";
    /// Legacy (pre-pack) runpack manifest file name.
    pub const LEGACY_MANIFEST: &str = "manifest.json";
    /// `run_payload.json` (run pack variant).
    pub const RUN_PAYLOAD: &str = "run_payload.json";
    /// `source/runpack.zip` (run and call pack variants).
    pub const SOURCE_RUNPACK: &str = "source/runpack.zip";
    /// `context_envelope.json` (run pack variant, optional).
    pub const CONTEXT_ENVELOPE: &str = "context_envelope.json";
    /// `job_payload.json` (job pack variant).
    pub const JOB_PAYLOAD: &str = "job_payload.json";
    /// `job_state.json` (job pack variant).
    pub const JOB_STATE: &str = "job_state.json";
    /// `job_events.jsonl` (job pack variant).
    pub const JOB_EVENTS: &str = "job_events.jsonl";
    /// `call_payload.json` (call pack variant).
    pub const CALL_PAYLOAD: &str = "call_payload.json";
    /// `callpack_manifest.json` (call pack variant).
    pub const CALLPACK_MANIFEST: &str = "callpack_manifest.json";
    /// `call_events.jsonl` (call pack variant).
    pub const CALL_EVENTS: &str = "call_events.jsonl";
    /// `commitments.jsonl` (call pack variant).
    pub const COMMITMENTS: &str = "commitments.jsonl";
    /// `gate_decisions.jsonl` (call pack variant).
    pub const GATE_DECISIONS: &str = "gate_decisions.jsonl";
    /// `speak_receipts.jsonl` (call pack variant).
    pub const SPEAK_RECEIPTS: &str = "speak_receipts.jsonl";
    /// `reference_digests.json` (call pack variant).
    pub const REFERENCE_DIGESTS: &str = "reference_digests.json";
}

/// One file supplied to the pack builder, already canonicalized by the
/// caller if it is JSON/JSONL.
#[derive(Debug, Clone)]
pub struct PackFile {
    /// Archive-relative path.
    pub path: String,
    /// Raw bytes as they will be written into the archive.
    pub data: Vec<u8>,
    /// Content type recorded in the manifest and proof chain.
    pub content_type: ContentType,
}

impl PackFile {
    /// Builds a new pack file entry.
    #[must_use]
    pub fn new(path: impl Into<String>, data: Vec<u8>, content_type: ContentType) -> Self {
        Self {
            path: path.into(),
            data,
            content_type,
        }
    }
}
