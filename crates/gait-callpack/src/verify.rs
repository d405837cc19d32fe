// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call pack verification: the common pack-level report plus the
//! call-specific cross-file invariants.

use crate::builder::{SCHEMA_ID, SCHEMA_VERSION};
use crate::types::{CallEvent, CallPayload, CallpackManifest, Commitment, GateDecision, ReferenceDigests, SpeakReceipt};
use crate::validate::{normalize_events, validate_callpack, CallpackValidationReport};
use gait_archive::ArchiveEntry;
use gait_error::{GaitError, GaitResult};
use gait_pack::{paths, PackVerificationReport, PackVerifierOptions};
use serde::de::DeserializeOwned;

/// Combined result of verifying a `call`-variant pack.
#[derive(Debug, Clone)]
pub struct CallpackVerificationReport {
    /// Common pack-level file-hash, proof-chain, and signature report.
    pub pack: PackVerificationReport,
    /// Call-specific cross-file invariant report.
    pub call: CallpackValidationReport,
}

impl CallpackVerificationReport {
    /// `true` only when both the pack-level and call-specific checks
    /// passed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.pack.is_clean() && self.call.is_clean()
    }
}

/// Verifies a `call`-variant pack end to end.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened at all, the pack
/// manifest does not parse, or any of the seven call-specific files
/// fails to parse as the expected JSON/JSONL shape. Cross-file
/// invariant violations are reported in the returned value, not raised
/// as errors.
pub fn verify_callpack(bytes: &[u8], options: &PackVerifierOptions) -> GaitResult<CallpackVerificationReport> {
    let _span = tracing::info_span!("gait_callpack.verify_callpack").entered();

    let pack_report = gait_pack::verify_pack(bytes, options)?;
    let entries = gait_archive::read_zip(bytes)?;

    let payload: CallPayload = parse_json(&entries, paths::CALL_PAYLOAD)?;
    let manifest: CallpackManifest = parse_json(&entries, paths::CALLPACK_MANIFEST)?;
    if manifest.schema_id != SCHEMA_ID || manifest.schema_version != SCHEMA_VERSION {
        return Err(GaitError::UnknownSchema {
            schema_id: manifest.schema_id,
            schema_version: manifest.schema_version,
        });
    }
    let mut events: Vec<CallEvent> = parse_jsonl(&entries, paths::CALL_EVENTS)?;
    let commitments: Vec<Commitment> = parse_jsonl(&entries, paths::COMMITMENTS)?;
    let gate_decisions: Vec<GateDecision> = parse_jsonl(&entries, paths::GATE_DECISIONS)?;
    let speak_receipts: Vec<SpeakReceipt> = parse_jsonl(&entries, paths::SPEAK_RECEIPTS)?;
    let _reference_digests: ReferenceDigests = parse_json(&entries, paths::REFERENCE_DIGESTS)?;

    let normalization_errors = normalize_events(&mut events);
    let mut call = validate_callpack(
        &payload,
        &manifest,
        &events,
        &commitments,
        &gate_decisions,
        &speak_receipts,
    );
    call.normalization_errors = normalization_errors;

    tracing::debug!(
        target: "gait.callpack",
        pack_id = %pack_report.pack_id,
        call_clean = call.is_clean(),
        "verified callpack"
    );

    Ok(CallpackVerificationReport { pack: pack_report, call })
}

fn find<'a>(entries: &'a [ArchiveEntry], path: &str) -> GaitResult<&'a ArchiveEntry> {
    entries
        .iter()
        .find(|e| e.path == path)
        .ok_or_else(|| GaitError::MissingField { field: path.to_string() })
}

fn parse_json<T: DeserializeOwned>(entries: &[ArchiveEntry], path: &str) -> GaitResult<T> {
    let entry = find(entries, path)?;
    serde_json::from_slice(&entry.data).map_err(|e| GaitError::InvalidInput {
        message: format!("failed to parse {path}: {e}"),
    })
}

fn parse_jsonl<T: DeserializeOwned>(entries: &[ArchiveEntry], path: &str) -> GaitResult<Vec<T>> {
    let entry = find(entries, path)?;
    let text = std::str::from_utf8(&entry.data).map_err(|e| GaitError::InvalidInput {
        message: format!("{path} is not valid utf-8: {e}"),
    })?;
    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| GaitError::InvalidInput {
                message: format!("failed to parse line in {path}: {e}"),
            })
        })
        .collect()
}
