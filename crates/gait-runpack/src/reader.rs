// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fail-fast runpack reading.
//!
//! [`read_runpack`] enforces every structural invariant eagerly and returns
//! on the first problem found. Use [`crate::verifier`] when a report
//! enumerating every problem is wanted instead.

use crate::builder::{SCHEMA_ID, SCHEMA_VERSION};
use crate::types::{paths, Intent, Refs, RunMetadata, RunpackManifest, ToolResult};
use gait_archive::ArchiveEntry;
use gait_core::ContextEvidenceMode;
use gait_error::{GaitError, GaitResult};
use serde::de::DeserializeOwned;

/// Options controlling [`read_runpack`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Skip recomputing and comparing `manifest_digest`.
    pub skip_digest_check: bool,
}

/// A fully parsed, structurally validated runpack.
#[derive(Debug, Clone)]
pub struct ReadRunpack {
    /// The parsed manifest.
    pub manifest: RunpackManifest,
    /// Parsed `run.json`.
    pub run_metadata: RunMetadata,
    /// Parsed `intents.jsonl`, in file order.
    pub intents: Vec<Intent>,
    /// Parsed `results.jsonl`, in file order.
    pub results: Vec<ToolResult>,
    /// Parsed `refs.json`.
    pub refs: Refs,
}

impl ReadRunpack {
    /// Returns the result linked to `intent_id`, if any.
    #[must_use]
    pub fn result_for(&self, intent_id: &str) -> Option<&ToolResult> {
        self.results.iter().find(|r| r.intent_id == intent_id)
    }
}

/// Reads and structurally validates a runpack from zip bytes.
///
/// # Errors
///
/// Returns [`GaitError::VerificationFailed`] on the first structural
/// mismatch found (missing declared file, hash mismatch, manifest digest
/// mismatch), [`GaitError::InvalidInput`] on schema/parse problems, and
/// [`GaitError::Io`] / [`GaitError::EntryTooLarge`] for archive-level
/// problems.
pub fn read_runpack(bytes: &[u8], options: &ReadOptions) -> GaitResult<ReadRunpack> {
    let entries = gait_archive::read_zip(bytes)?;

    let manifest: RunpackManifest = parse_json(find(&entries, paths::MANIFEST)?)?;

    if manifest.schema_id != SCHEMA_ID {
        return Err(GaitError::UnknownSchema {
            schema_id: manifest.schema_id.clone(),
            schema_version: manifest.schema_version.clone(),
        });
    }
    if manifest.schema_version != SCHEMA_VERSION {
        return Err(GaitError::UnknownSchema {
            schema_id: manifest.schema_id.clone(),
            schema_version: manifest.schema_version.clone(),
        });
    }
    if manifest.run_id.as_str().is_empty() {
        return Err(GaitError::MissingField {
            field: "run_id".to_string(),
        });
    }

    for declared in &manifest.files {
        let entry = find(&entries, &declared.path).map_err(|_| {
            GaitError::verification(format!("declared file missing from archive: {}", declared.path))
        })?;
        let actual = gait_canon::sha256_hex(&entry.data);
        if actual != declared.sha256 {
            return Err(GaitError::verification(format!(
                "hash mismatch at {}: expected {}, got {actual}",
                declared.path, declared.sha256
            )));
        }
    }

    if !options.skip_digest_check {
        let recomputed_bytes = gait_canon::to_canonical_bytes(&manifest.cleared_for_digest())?;
        let recomputed = gait_canon::sha256_hex(&recomputed_bytes);
        if recomputed != manifest.manifest_digest {
            return Err(GaitError::verification(format!(
                "manifest_digest mismatch: expected {}, recomputed {recomputed}",
                manifest.manifest_digest
            )));
        }
    }

    let run_metadata = parse_json(find(&entries, paths::RUN)?)?;
    let intents = parse_jsonl(find(&entries, paths::INTENTS)?)?;
    let results = parse_jsonl(find(&entries, paths::RESULTS)?)?;
    let refs: Refs = parse_json(find(&entries, paths::REFS)?)?;

    if matches!(refs.context_evidence_mode, ContextEvidenceMode::Required) && refs.context_set_digest.is_empty() {
        return Err(GaitError::MissingField {
            field: "refs.context_set_digest".to_string(),
        });
    }

    Ok(ReadRunpack {
        manifest,
        run_metadata,
        intents,
        results,
        refs,
    })
}

fn find<'a>(entries: &'a [ArchiveEntry], path: &str) -> GaitResult<&'a ArchiveEntry> {
    entries
        .iter()
        .find(|e| e.path == path)
        .ok_or_else(|| GaitError::MissingField {
            field: path.to_string(),
        })
}

fn parse_json<T: DeserializeOwned>(entry: &ArchiveEntry) -> GaitResult<T> {
    serde_json::from_slice(&entry.data).map_err(|e| GaitError::InvalidInput {
        message: format!("failed to parse {}: {e}", entry.path),
    })
}

fn parse_jsonl<T: DeserializeOwned>(entry: &ArchiveEntry) -> GaitResult<Vec<T>> {
    let text = std::str::from_utf8(&entry.data).map_err(|e| GaitError::InvalidInput {
        message: format!("{} is not valid utf-8: {e}", entry.path),
    })?;
    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| GaitError::InvalidInput {
                message: format!("failed to parse line in {}: {e}", entry.path),
            })
        })
        .collect()
}
