// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pack verification: a structured report enumerating every problem
//! found across file hashes, the proof-record chain, and the manifest
//! signature.

use crate::builder::{SCHEMA_ID, SCHEMA_VERSION};
use crate::types::{paths, PackManifest, PackType, ProofRecord};
use ed25519_dalek::VerifyingKey;
use gait_archive::ArchiveEntry;
use gait_core::SignatureStatus;
use gait_error::{GaitError, GaitResult};
use gait_sign::CanonicalBytes;

/// Options controlling [`verify_pack`].
#[derive(Debug, Clone, Default)]
pub struct PackVerifierOptions {
    /// Public key to verify the manifest and proof-record signatures
    /// against, if any.
    pub public_key: Option<VerifyingKey>,
    /// Whether a caller treats a missing signature as a failure.
    pub require_signature: bool,
}

/// Structured pack verification result.
#[derive(Debug, Clone)]
pub struct PackVerificationReport {
    /// `pack_id` as declared in the manifest, when parsing succeeded.
    pub pack_id: String,
    /// Whether the recomputed `pack_id` matches the declared one.
    pub pack_id_ok: bool,
    /// Whether `schema_id`/`schema_version` are recognized. `false` for
    /// legacy pre-pack archives (see [`verify_pack`]).
    pub schema_ok: bool,
    /// Variant this pack declares itself as.
    pub pack_type: PackType,
    /// Declared files absent from the archive, sorted by path.
    pub missing_files: Vec<String>,
    /// Declared files present but with a hash mismatch, sorted by path.
    pub hash_mismatches: Vec<String>,
    /// Archive entries present but not declared in `contents[]`, sorted.
    pub undeclared_files: Vec<String>,
    /// Problems found while verifying the proof-record chain.
    pub proof_chain_errors: Vec<String>,
    /// Problems found verifying variant-specific payload presence.
    pub payload_contract_errors: Vec<String>,
    /// Manifest signature verification outcome.
    pub signature_status: SignatureStatus,
    /// Echoes [`PackVerifierOptions::require_signature`].
    pub require_signature: bool,
}

impl PackVerificationReport {
    /// `true` only when every check passed and, if a signature was
    /// required, it verified.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.schema_ok
            && self.pack_id_ok
            && self.missing_files.is_empty()
            && self.hash_mismatches.is_empty()
            && self.undeclared_files.is_empty()
            && self.proof_chain_errors.is_empty()
            && self.payload_contract_errors.is_empty()
            && match (self.require_signature, self.signature_status) {
                (true, SignatureStatus::Verified) => true,
                (true, _) => false,
                (false, SignatureStatus::Failed) => false,
                (false, _) => true,
            }
    }
}

/// Verifies a pack, enumerating every problem rather than stopping at the
/// first.
///
/// Archives carrying a legacy `manifest.json` (no `pack_manifest.json`)
/// are dispatched to [`gait_runpack::verify_runpack`] and the result is
/// translated into a degenerate report: `pack_type` is reported as
/// [`PackType::Run`], `proof_chain_errors` is always empty (legacy
/// archives predate the proof chain), and `payload_contract_errors` is
/// always empty.
///
/// # Errors
///
/// Returns an error only for problems that prevent building a report at
/// all: a malformed zip or a manifest that does not parse.
pub fn verify_pack(bytes: &[u8], options: &PackVerifierOptions) -> GaitResult<PackVerificationReport> {
    let _span = tracing::info_span!("gait_pack.verify_pack").entered();

    let entries = gait_archive::read_zip(bytes)?;

    if find(&entries, paths::PACK_MANIFEST).is_err() {
        if find(&entries, paths::LEGACY_MANIFEST).is_ok() {
            return verify_legacy_runpack(bytes, options);
        }
        return Err(GaitError::MissingField {
            field: paths::PACK_MANIFEST.to_string(),
        });
    }

    let manifest_entry = find(&entries, paths::PACK_MANIFEST)?;
    let manifest: PackManifest = serde_json::from_slice(&manifest_entry.data).map_err(|e| {
        GaitError::InvalidInput {
            message: format!("failed to parse {}: {e}", paths::PACK_MANIFEST),
        }
    })?;

    let schema_ok = manifest.schema_id == SCHEMA_ID && manifest.schema_version == SCHEMA_VERSION;

    let mut missing_files = Vec::new();
    let mut hash_mismatches = Vec::new();
    for declared in &manifest.contents {
        match find(&entries, &declared.path) {
            Ok(entry) => {
                let actual = gait_canon::sha256_hex(&entry.data);
                if actual != declared.sha256 {
                    hash_mismatches.push(declared.path.clone());
                }
            }
            Err(_) => missing_files.push(declared.path.clone()),
        }
    }
    missing_files.sort();
    hash_mismatches.sort();

    let declared_paths: std::collections::BTreeSet<&str> =
        manifest.contents.iter().map(|c| c.path.as_str()).collect();
    let mut undeclared_files: Vec<String> = entries
        .iter()
        .map(|e| e.path.as_str())
        .filter(|p| *p != paths::PACK_MANIFEST && !declared_paths.contains(p))
        .map(str::to_string)
        .collect();
    undeclared_files.sort();

    let signable_bytes = gait_canon::to_canonical_bytes(&manifest.cleared_for_digest())?;
    let recomputed_pack_id = gait_canon::sha256_hex(&signable_bytes);
    let pack_id_ok = recomputed_pack_id == manifest.pack_id;

    let proof_chain_errors = verify_proof_chain(&entries, options.public_key.as_ref());
    let payload_contract_errors = verify_payload_contract(manifest.pack_type, &declared_paths);

    let signature_status = manifest_signature_status(&manifest, &signable_bytes, options.public_key.as_ref());

    tracing::debug!(
        target: "gait.pack",
        pack_id = %manifest.pack_id,
        pack_id_ok,
        pack_type = ?manifest.pack_type,
        "verified pack"
    );

    Ok(PackVerificationReport {
        pack_id: manifest.pack_id,
        pack_id_ok,
        schema_ok,
        pack_type: manifest.pack_type,
        missing_files,
        hash_mismatches,
        undeclared_files,
        proof_chain_errors,
        payload_contract_errors,
        signature_status,
        require_signature: options.require_signature,
    })
}

fn verify_legacy_runpack(
    bytes: &[u8],
    options: &PackVerifierOptions,
) -> GaitResult<PackVerificationReport> {
    let runpack_options = gait_runpack::RunpackVerifierOptions {
        public_key: options.public_key,
        require_signature: options.require_signature,
    };
    let report = gait_runpack::verify_runpack(bytes, &runpack_options)?;
    Ok(PackVerificationReport {
        pack_id: report.manifest_digest,
        pack_id_ok: report.manifest_digest_ok,
        schema_ok: report.schema_ok,
        pack_type: PackType::Run,
        missing_files: report.missing_files,
        hash_mismatches: report.hash_mismatches,
        undeclared_files: Vec::new(),
        proof_chain_errors: Vec::new(),
        payload_contract_errors: Vec::new(),
        signature_status: report.signature_status,
        require_signature: report.require_signature,
    })
}

/// Checks that the payload files a pack variant requires are present
/// among its declared contents. The `call` variant's deeper cross-file
/// invariants (event coverage, causality, ordering) are layered on top of
/// this by a higher-level validator that consumes this report.
fn verify_payload_contract(
    pack_type: PackType,
    declared_paths: &std::collections::BTreeSet<&str>,
) -> Vec<String> {
    let required: &[&str] = match pack_type {
        PackType::Run => &[paths::RUN_PAYLOAD, paths::SOURCE_RUNPACK],
        PackType::Job => &[paths::JOB_PAYLOAD, paths::JOB_STATE, paths::JOB_EVENTS],
        PackType::Call => &[
            paths::CALL_PAYLOAD,
            paths::CALLPACK_MANIFEST,
            paths::CALL_EVENTS,
            paths::COMMITMENTS,
            paths::GATE_DECISIONS,
            paths::SPEAK_RECEIPTS,
            paths::REFERENCE_DIGESTS,
            paths::SOURCE_RUNPACK,
        ],
    };
    let mut errors: Vec<String> = required
        .iter()
        .filter(|p| !declared_paths.contains(*p))
        .map(|p| format!("missing required payload file for pack_type {pack_type:?}: {p}"))
        .collect();
    errors.sort();
    errors
}

fn verify_proof_chain(entries: &[ArchiveEntry], public_key: Option<&VerifyingKey>) -> Vec<String> {
    let Ok(proof_entry) = find(entries, paths::PROOF_RECORDS) else {
        return vec!["proof_records.jsonl is missing".to_string()];
    };
    let Ok(text) = std::str::from_utf8(&proof_entry.data) else {
        return vec!["proof_records.jsonl is not valid utf-8".to_string()];
    };

    let mut errors = Vec::new();
    let mut previous_record_hash = String::new();
    for (line_no, line) in text.lines().filter(|l| !l.is_empty()).enumerate() {
        let record: ProofRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                errors.push(format!("proof_records.jsonl line {line_no}: failed to parse: {e}"));
                continue;
            }
        };

        if record.integrity.previous_record_hash != previous_record_hash {
            errors.push(format!(
                "proof_records.jsonl line {line_no} ({}): previous_record_hash does not chain",
                record.path
            ));
        }

        let recomputed = match gait_canon::to_canonical_bytes(&record.cleared_for_digest()) {
            Ok(bytes) => gait_canon::sha256_hex(&bytes),
            Err(e) => {
                errors.push(format!("proof_records.jsonl line {line_no}: {e}"));
                continue;
            }
        };
        if recomputed != record.integrity.record_hash {
            errors.push(format!(
                "proof_records.jsonl line {line_no} ({}): record_hash mismatch",
                record.path
            ));
        }

        if let (Some(public_key), Some(signature_hex)) = (public_key, record.integrity.signature.as_ref()) {
            let verified = gait_sign::signature_from_hex(signature_hex)
                .map(|signature| {
                    gait_sign::verify_canonical_bytes(
                        public_key,
                        CanonicalBytes::assert_canonical(record.integrity.record_hash.as_bytes()),
                        &signature,
                    )
                })
                .unwrap_or(false);
            if !verified {
                errors.push(format!(
                    "proof_records.jsonl line {line_no} ({}): signature does not verify",
                    record.path
                ));
            }
        }

        previous_record_hash = record.integrity.record_hash;
    }

    errors.sort();
    errors
}

fn manifest_signature_status(
    manifest: &PackManifest,
    signable_bytes: &[u8],
    public_key: Option<&VerifyingKey>,
) -> SignatureStatus {
    if manifest.signatures.is_empty() {
        return SignatureStatus::Missing;
    }
    let Some(public_key) = public_key else {
        return SignatureStatus::Skipped;
    };
    let all_verified = manifest.signatures.iter().all(|sig| {
        gait_sign::signature_from_hex(&sig.signature)
            .map(|signature| {
                gait_sign::verify_canonical_bytes(
                    public_key,
                    CanonicalBytes::assert_canonical(signable_bytes),
                    &signature,
                )
            })
            .unwrap_or(false)
    });
    if all_verified {
        SignatureStatus::Verified
    } else {
        SignatureStatus::Failed
    }
}

fn find<'a>(entries: &'a [ArchiveEntry], path: &str) -> GaitResult<&'a ArchiveEntry> {
    entries
        .iter()
        .find(|e| e.path == path)
        .ok_or_else(|| GaitError::MissingField {
            field: path.to_string(),
        })
}
