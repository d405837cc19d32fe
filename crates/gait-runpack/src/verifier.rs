// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runpack verification: a structured report enumerating every problem
//! found, rather than erroring on the first.

use crate::types::{paths, Refs, RunpackManifest};
use ed25519_dalek::VerifyingKey;
use gait_archive::ArchiveEntry;
use gait_core::{ContextEvidenceMode, RunId, SignatureStatus};
use gait_error::GaitResult;
use gait_sign::CanonicalBytes;

/// Options controlling [`verify_runpack`].
#[derive(Debug, Clone, Default)]
pub struct RunpackVerifierOptions {
    /// Public key to verify manifest signatures against, if any.
    pub public_key: Option<VerifyingKey>,
    /// Whether a caller treats a missing signature as a failure. Recorded
    /// on the report for the caller to act on; this function itself never
    /// errors solely because a signature is absent.
    pub require_signature: bool,
}

/// Structured runpack verification result.
#[derive(Debug, Clone)]
pub struct RunpackVerificationReport {
    /// The run id declared in the manifest, when parsing succeeded.
    pub run_id: RunId,
    /// Whether `schema_id`/`schema_version`/`run_id` are well-formed.
    pub schema_ok: bool,
    /// Declared files absent from the archive, sorted by path.
    pub missing_files: Vec<String>,
    /// Declared files present but with a hash mismatch, sorted by path.
    pub hash_mismatches: Vec<String>,
    /// The manifest digest as stored.
    pub manifest_digest: String,
    /// Whether the recomputed manifest digest matches the stored one.
    pub manifest_digest_ok: bool,
    /// `false` if `refs.json` declares `context_evidence_mode: required`
    /// with an empty `context_set_digest`.
    pub refs_context_evidence_ok: bool,
    /// Signature verification outcome.
    pub signature_status: SignatureStatus,
    /// Echoes [`RunpackVerifierOptions::require_signature`] for callers that
    /// only hold the report.
    pub require_signature: bool,
}

impl RunpackVerificationReport {
    /// `true` only when every structural check passed and, if a signature
    /// was required, it verified.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.schema_ok
            && self.missing_files.is_empty()
            && self.hash_mismatches.is_empty()
            && self.manifest_digest_ok
            && self.refs_context_evidence_ok
            && match (self.require_signature, self.signature_status) {
                (true, SignatureStatus::Verified) => true,
                (true, _) => false,
                (false, SignatureStatus::Failed) => false,
                (false, _) => true,
            }
    }
}

/// Verifies a runpack, enumerating every structural problem rather than
/// stopping at the first.
///
/// # Errors
///
/// Returns an error only for problems that prevent building a report at
/// all: a malformed zip, a missing manifest entry, or a manifest that does
/// not parse as JSON.
pub fn verify_runpack(
    bytes: &[u8],
    options: &RunpackVerifierOptions,
) -> GaitResult<RunpackVerificationReport> {
    let _span = tracing::info_span!("gait_runpack.verify_runpack").entered();

    let entries = gait_archive::read_zip(bytes)?;
    let manifest_entry = find(&entries, paths::MANIFEST)?;
    let manifest: RunpackManifest =
        serde_json::from_slice(&manifest_entry.data).map_err(|e| gait_error::GaitError::InvalidInput {
            message: format!("failed to parse manifest.json: {e}"),
        })?;

    let schema_ok = manifest.schema_id == crate::builder::SCHEMA_ID
        && manifest.schema_version == crate::builder::SCHEMA_VERSION
        && !manifest.run_id.as_str().is_empty();

    let mut missing_files = Vec::new();
    let mut hash_mismatches = Vec::new();
    for declared in &manifest.files {
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

    let signable_bytes = gait_canon::to_canonical_bytes(&manifest.cleared_for_digest())?;
    let recomputed_digest = gait_canon::sha256_hex(&signable_bytes);
    let manifest_digest_ok = recomputed_digest == manifest.manifest_digest;

    let signature_status = signature_status(&manifest, &signable_bytes, options.public_key.as_ref());

    let refs_context_evidence_ok = match find(&entries, paths::REFS) {
        Ok(entry) => refs_context_evidence_ok(entry),
        Err(_) => false,
    };

    tracing::debug!(
        target: "gait.runpack",
        run_id = %manifest.run_id,
        manifest_digest_ok,
        "verified runpack"
    );

    Ok(RunpackVerificationReport {
        run_id: manifest.run_id.clone(),
        schema_ok,
        missing_files,
        hash_mismatches,
        manifest_digest: manifest.manifest_digest,
        manifest_digest_ok,
        refs_context_evidence_ok,
        signature_status,
        require_signature: options.require_signature,
    })
}

/// `false` if `refs.json` fails to parse, or declares
/// `context_evidence_mode: required` with an empty `context_set_digest`.
fn refs_context_evidence_ok(entry: &ArchiveEntry) -> bool {
    let Ok(refs) = serde_json::from_slice::<Refs>(&entry.data) else {
        return false;
    };
    !matches!(refs.context_evidence_mode, ContextEvidenceMode::Required) || !refs.context_set_digest.is_empty()
}

fn signature_status(
    manifest: &RunpackManifest,
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
        .ok_or_else(|| gait_error::GaitError::MissingField {
            field: path.to_string(),
        })
}
