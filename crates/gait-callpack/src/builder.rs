// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call pack assembly: validates the cross-file invariants, then hands
//! the assembled payload files to the common outer-pack builder.

use crate::types::{
    CallEvent, CallPayload, CallpackManifest, Commitment, GateDecision, PrivacyMode,
    ReferenceDigests, SpeakReceipt,
};
use crate::validate::{normalize_events, validate_callpack};
use ed25519_dalek::SigningKey;
use gait_error::{GaitError, GaitResult};
use gait_pack::{BuiltPack, ContentType, PackFile, PackType};

/// Fixed schema identifier for `callpack_manifest.json`.
pub const SCHEMA_ID: &str = "gait.callpack.manifest";
/// Fixed schema version for `callpack_manifest.json`.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Inputs to [`build_callpack`].
pub struct CallpackInputs {
    /// Identifier of the wrapped call, used as both `call_id` and the
    /// pack's `source_ref`.
    pub call_id: String,
    /// Fixed creation timestamp, shared by the payload and manifest.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Retention policy applied to this call.
    pub privacy_mode: PrivacyMode,
    /// Events; normalized (sorted, lowercased) in place before use.
    pub events: Vec<CallEvent>,
    /// Declared commitments.
    pub commitments: Vec<Commitment>,
    /// Gate decisions.
    pub gate_decisions: Vec<GateDecision>,
    /// Speak receipts.
    pub speak_receipts: Vec<SpeakReceipt>,
    /// Reference digests retained regardless of `privacy_mode`.
    pub reference_digests: ReferenceDigests,
    /// Bytes of the embedded runpack (`source/runpack.zip`).
    pub runpack_bytes: Vec<u8>,
}

/// Validates `inputs`' cross-file invariants and, if they hold, builds a
/// `call`-variant pack.
///
/// # Errors
///
/// Returns [`GaitError::VerificationFailed`] listing every violated
/// invariant if validation fails, or an error from the underlying
/// canonicalization/archive/signing steps.
pub fn build_callpack(
    mut inputs: CallpackInputs,
    producer_version: impl Into<String>,
    signing_key: Option<&SigningKey>,
) -> GaitResult<BuiltPack> {
    let mut errors = normalize_events(&mut inputs.events);

    let payload = CallPayload {
        call_id: inputs.call_id.clone(),
        created_at: inputs.created_at,
        privacy_mode: inputs.privacy_mode,
        event_count: inputs.events.len() as u64,
        commitment_count: inputs.commitments.len() as u64,
    };
    let manifest = CallpackManifest {
        schema_id: SCHEMA_ID.to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        created_at: inputs.created_at,
        call_id: inputs.call_id.clone(),
        privacy_mode: inputs.privacy_mode,
        event_count: payload.event_count,
        commitment_count: payload.commitment_count,
    };

    let report = validate_callpack(
        &payload,
        &manifest,
        &inputs.events,
        &inputs.commitments,
        &inputs.gate_decisions,
        &inputs.speak_receipts,
    );
    errors.extend(report.missing_event_types.iter().map(|t| format!("missing required event type: {t}")));
    errors.extend(report.causality_errors);
    errors.extend(report.gated_emit_errors);
    errors.extend(report.manifest_consistency_errors);

    if !errors.is_empty() {
        errors.sort();
        return Err(GaitError::VerificationFailed {
            message: errors.join("; "),
            hint: "re-run verify after checking artifact integrity".to_string(),
        });
    }

    let files = vec![
        PackFile::new(
            gait_pack::paths::CALL_PAYLOAD,
            gait_canon::to_canonical_bytes(&payload)?,
            ContentType::Json,
        ),
        PackFile::new(
            gait_pack::paths::CALLPACK_MANIFEST,
            gait_canon::to_canonical_bytes(&manifest)?,
            ContentType::Json,
        ),
        PackFile::new(
            gait_pack::paths::CALL_EVENTS,
            encode_jsonl(&inputs.events)?,
            ContentType::Jsonl,
        ),
        PackFile::new(
            gait_pack::paths::COMMITMENTS,
            encode_jsonl(&inputs.commitments)?,
            ContentType::Jsonl,
        ),
        PackFile::new(
            gait_pack::paths::GATE_DECISIONS,
            encode_jsonl(&inputs.gate_decisions)?,
            ContentType::Jsonl,
        ),
        PackFile::new(
            gait_pack::paths::SPEAK_RECEIPTS,
            encode_jsonl(&inputs.speak_receipts)?,
            ContentType::Jsonl,
        ),
        PackFile::new(
            gait_pack::paths::REFERENCE_DIGESTS,
            gait_canon::to_canonical_bytes(&inputs.reference_digests)?,
            ContentType::Json,
        ),
        PackFile::new(gait_pack::paths::SOURCE_RUNPACK, inputs.runpack_bytes, ContentType::Zip),
    ];

    gait_pack::build_pack(PackType::Call, inputs.call_id, producer_version, files, signing_key)
}

fn encode_jsonl<T: serde::Serialize>(items: &[T]) -> GaitResult<Vec<u8>> {
    let mut out = Vec::new();
    for item in items {
        out.extend_from_slice(&gait_canon::to_canonical_bytes(item)?);
        out.push(b'\n');
    }
    Ok(out)
}
