// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outer pack assembly: proof-record chaining, manifest digesting, and
//! deterministic zip writing, shared by every pack variant.

use crate::types::{
    paths, ContentType, PackContentEntry, PackFile, PackManifest, ProofIntegrity, ProofRecord,
};
use crate::PackType;
use ed25519_dalek::SigningKey;
use gait_archive::ArchiveEntry;
use gait_error::GaitResult;
use gait_sign::CanonicalBytes;

/// Result of a successful [`build_pack`] call.
#[derive(Debug, Clone)]
pub struct BuiltPack {
    /// Deterministic zip bytes.
    pub bytes: Vec<u8>,
    /// The manifest embedded in `bytes`.
    pub manifest: PackManifest,
}

/// Assembles a pack from an already-built set of variant payload files.
///
/// `files` must contain every payload file for the chosen `pack_type`
/// (see the per-variant path constants in [`crate::types::paths`]) and must
/// not include `pack_manifest.json` or `proof_records.jsonl`, which this
/// function computes itself. JSON/JSONL files must already be
/// canonicalized by the caller: this function hashes the bytes it is
/// given, it does not re-canonicalize them.
///
/// # Errors
///
/// Returns an error if canonical encoding or deterministic zip writing
/// fails.
pub fn build_pack(
    pack_type: PackType,
    source_ref: String,
    producer_version: impl Into<String>,
    mut files: Vec<PackFile>,
    signing_key: Option<&SigningKey>,
) -> GaitResult<BuiltPack> {
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let proof_records = build_proof_chain(&files, signing_key)?;
    let proof_bytes = encode_jsonl(&proof_records)?;

    let mut contents: Vec<PackContentEntry> = files
        .iter()
        .map(|f| PackContentEntry {
            path: f.path.clone(),
            sha256: gait_canon::sha256_hex(&f.data),
            content_type: f.content_type,
        })
        .collect();
    contents.push(PackContentEntry {
        path: paths::PROOF_RECORDS.to_string(),
        sha256: gait_canon::sha256_hex(&proof_bytes),
        content_type: ContentType::Jsonl,
    });
    contents.sort_by(|a, b| a.path.cmp(&b.path));

    let mut manifest = PackManifest {
        schema_id: SCHEMA_ID.to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        created_at: gait_core::deterministic_epoch(),
        producer_version: producer_version.into(),
        pack_id: String::new(),
        pack_type,
        source_ref,
        contents,
        signatures: Vec::new(),
    };

    let signable_bytes = gait_canon::to_canonical_bytes(&manifest.cleared_for_digest())?;
    manifest.pack_id = gait_canon::sha256_hex(&signable_bytes);

    if let Some(signing_key) = signing_key {
        let signature =
            gait_sign::sign_canonical_bytes(signing_key, CanonicalBytes::assert_canonical(&signable_bytes));
        manifest.signatures.push(gait_core::ManifestSignature {
            signing_key_id: gait_sign::key_id(&signing_key.verifying_key()),
            signature: gait_sign::signature_to_hex(&signature),
        });
    }

    let manifest_bytes = gait_canon::to_canonical_bytes(&manifest)?;

    let mut entries = Vec::with_capacity(files.len() + 2);
    entries.push(ArchiveEntry::new(paths::PACK_MANIFEST, manifest_bytes));
    entries.push(ArchiveEntry::new(paths::PROOF_RECORDS, proof_bytes));
    for file in files {
        entries.push(ArchiveEntry::new(file.path, file.data));
    }

    let bytes = gait_archive::write_deterministic_zip(&entries)?;
    Ok(BuiltPack { bytes, manifest })
}

/// Builds the hash-chained proof record for each file, in the order given
/// (callers must pass `files` already sorted by path).
fn build_proof_chain(files: &[PackFile], signing_key: Option<&SigningKey>) -> GaitResult<Vec<ProofRecord>> {
    let mut records = Vec::with_capacity(files.len());
    let mut previous_record_hash = String::new();

    for file in files {
        let mut record = ProofRecord {
            path: file.path.clone(),
            sha256: gait_canon::sha256_hex(&file.data),
            content_type: file.content_type,
            integrity: ProofIntegrity {
                previous_record_hash: previous_record_hash.clone(),
                record_hash: String::new(),
                signing_key_id: None,
                signature: None,
            },
        };

        let signable_bytes = gait_canon::to_canonical_bytes(&record.cleared_for_digest())?;
        let record_hash = gait_canon::sha256_hex(&signable_bytes);
        record.integrity.record_hash = record_hash.clone();

        if let Some(signing_key) = signing_key {
            let signature = gait_sign::sign_canonical_bytes(
                signing_key,
                CanonicalBytes::assert_canonical(record_hash.as_bytes()),
            );
            record.integrity.signing_key_id = Some(gait_sign::key_id(&signing_key.verifying_key()));
            record.integrity.signature = Some(gait_sign::signature_to_hex(&signature));
        }

        previous_record_hash = record_hash;
        records.push(record);
    }

    Ok(records)
}

fn encode_jsonl<T: serde::Serialize>(items: &[T]) -> GaitResult<Vec<u8>> {
    let mut out = Vec::new();
    for item in items {
        out.extend_from_slice(&gait_canon::to_canonical_bytes(item)?);
        out.push(b'\n');
    }
    Ok(out)
}

/// Fixed schema identifier for `pack_manifest.json`.
pub const SCHEMA_ID: &str = "gait.pack.manifest";
/// Fixed schema version for `pack_manifest.json`.
pub const SCHEMA_VERSION: &str = "1.0.0";
/// Producer version used when a caller doesn't supply one.
pub const DEFAULT_PRODUCER_VERSION: &str = "0.0.0-dev";
