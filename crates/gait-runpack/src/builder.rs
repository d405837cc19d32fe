// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runpack construction.

use crate::types::{paths, Intent, RefEntry, Refs, RunMetadata, RunpackManifest, ToolResult};
use ed25519_dalek::SigningKey;
use gait_archive::ArchiveEntry;
use gait_core::{CaptureMode, ContextEvidenceMode, FileHashEntry, ManifestSignature, RunId};
use gait_error::{GaitError, GaitResult};
use gait_sign::CanonicalBytes;
use serde::Serialize;

/// Schema identifier written into every built manifest.
pub const SCHEMA_ID: &str = "gait.runpack.manifest";
/// Schema version written into every built manifest.
pub const SCHEMA_VERSION: &str = "1.0.0";
/// Default producer version when the caller does not supply one.
pub const DEFAULT_PRODUCER_VERSION: &str = "0.0.0-dev";

/// The output of [`RunpackBuilder::build`]: the deterministic zip bytes
/// plus the manifest that was embedded in them.
#[derive(Debug, Clone)]
pub struct BuiltRunpack {
    /// Deterministic zip archive bytes.
    pub bytes: Vec<u8>,
    /// The manifest embedded in `bytes`.
    pub manifest: RunpackManifest,
}

/// Builds a runpack from recorded run data.
///
/// All timestamps are supplied by the caller rather than captured from the
/// wall clock, so that [`RunpackBuilder::build`] is a pure function of its
/// inputs and satisfies the determinism contract: the same inputs always
/// produce byte-identical archives.
pub struct RunpackBuilder {
    run_id: RunId,
    created_at: chrono::DateTime<chrono::Utc>,
    producer_version: String,
    capture_mode: CaptureMode,
    run_metadata: RunMetadata,
    intents: Vec<Intent>,
    results: Vec<ToolResult>,
    refs: Refs,
    signing_key: Option<SigningKey>,
}

impl RunpackBuilder {
    /// Starts building a runpack for `run_id`, built as of `created_at`.
    #[must_use]
    pub fn new(run_id: RunId, created_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            run_metadata: RunMetadata {
                run_id: run_id.clone(),
                environment: serde_json::Value::Object(serde_json::Map::new()),
                timeline: Vec::new(),
            },
            run_id,
            created_at,
            producer_version: DEFAULT_PRODUCER_VERSION.to_string(),
            capture_mode: CaptureMode::Reference,
            intents: Vec::new(),
            results: Vec::new(),
            refs: Refs {
                context_set_digest: String::new(),
                context_evidence_mode: ContextEvidenceMode::BestEffort,
                entries: Vec::new(),
            },
            signing_key: None,
        }
    }

    /// Overrides the producer version string (default `"0.0.0-dev"`).
    #[must_use]
    pub fn producer_version(mut self, version: impl Into<String>) -> Self {
        self.producer_version = version.into();
        self
    }

    /// Sets the capture mode (default [`CaptureMode::Reference`]).
    #[must_use]
    pub fn capture_mode(mut self, mode: CaptureMode) -> Self {
        self.capture_mode = mode;
        self
    }

    /// Replaces the run metadata record.
    #[must_use]
    pub fn run_metadata(mut self, metadata: RunMetadata) -> Self {
        self.run_metadata = metadata;
        self
    }

    /// Appends one recorded intent.
    #[must_use]
    pub fn add_intent(mut self, intent: Intent) -> Self {
        self.intents.push(intent);
        self
    }

    /// Appends one recorded tool result.
    #[must_use]
    pub fn add_result(mut self, result: ToolResult) -> Self {
        self.results.push(result);
        self
    }

    /// Replaces the context/reference receipts.
    #[must_use]
    pub fn refs(mut self, refs: Refs) -> Self {
        self.refs = refs;
        self
    }

    /// Supplies a key the manifest will be signed with.
    #[must_use]
    pub fn sign_with(mut self, signing_key: SigningKey) -> Self {
        self.signing_key = Some(signing_key);
        self
    }

    /// Builds the deterministic runpack archive.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::MissingField`] if `context_evidence_mode` is
    /// `required` but `context_set_digest` is empty, or any canonicalization
    /// / archive error surfaced while assembling the files.
    pub fn build(self) -> GaitResult<BuiltRunpack> {
        if matches!(self.refs.context_evidence_mode, ContextEvidenceMode::Required)
            && self.refs.context_set_digest.is_empty()
        {
            return Err(GaitError::MissingField {
                field: "refs.context_set_digest".to_string(),
            });
        }

        let run_bytes = gait_canon::to_canonical_bytes(&self.run_metadata)?;
        let intents_bytes = encode_jsonl(&self.intents)?;
        let results_bytes = encode_jsonl(&self.results)?;
        let refs_bytes = gait_canon::to_canonical_bytes(&self.refs)?;

        let mut files = vec![
            file_hash_entry(paths::RUN, &run_bytes),
            file_hash_entry(paths::INTENTS, &intents_bytes),
            file_hash_entry(paths::RESULTS, &results_bytes),
            file_hash_entry(paths::REFS, &refs_bytes),
        ];
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut manifest = RunpackManifest {
            schema_id: SCHEMA_ID.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: self.created_at,
            producer_version: self.producer_version,
            run_id: self.run_id,
            capture_mode: self.capture_mode,
            files,
            manifest_digest: String::new(),
            signatures: Vec::new(),
        };

        let digest_bytes = gait_canon::to_canonical_bytes(&manifest.cleared_for_digest())?;
        manifest.manifest_digest = gait_canon::sha256_hex(&digest_bytes);

        if let Some(signing_key) = &self.signing_key {
            let signable = gait_canon::to_canonical_bytes(&manifest.cleared_for_digest())?;
            let signature = gait_sign::sign_canonical_bytes(
                signing_key,
                CanonicalBytes::assert_canonical(&signable),
            );
            manifest.signatures.push(ManifestSignature {
                signing_key_id: gait_sign::key_id(&signing_key.verifying_key()),
                signature: gait_sign::signature_to_hex(&signature),
            });
        }

        let manifest_bytes = gait_canon::to_canonical_bytes(&manifest)?;

        let entries = vec![
            ArchiveEntry::new(paths::MANIFEST, manifest_bytes),
            ArchiveEntry::new(paths::RUN, run_bytes),
            ArchiveEntry::new(paths::INTENTS, intents_bytes),
            ArchiveEntry::new(paths::RESULTS, results_bytes),
            ArchiveEntry::new(paths::REFS, refs_bytes),
        ];
        let bytes = gait_archive::write_deterministic_zip(&entries)?;

        Ok(BuiltRunpack { bytes, manifest })
    }
}

fn file_hash_entry(path: &str, canonical_bytes: &[u8]) -> FileHashEntry {
    FileHashEntry {
        path: path.to_string(),
        sha256: gait_canon::sha256_hex(canonical_bytes),
    }
}

fn encode_jsonl<T: Serialize>(items: &[T]) -> GaitResult<Vec<u8>> {
    let mut out = Vec::new();
    for item in items {
        out.extend(gait_canon::to_canonical_bytes(item)?);
        out.push(b'\n');
    }
    Ok(out)
}

/// Convenience constructor for a ref entry.
#[must_use]
pub fn ref_entry(id: impl Into<String>, digest: impl Into<String>) -> RefEntry {
    RefEntry {
        id: id.into(),
        digest: digest.into(),
    }
}
