// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record shapes for the five call-specific JSON(L) files a call pack
//! carries alongside the common pack machinery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `privacy_mode` recorded in both `call_payload.json` and
/// `callpack_manifest.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyMode {
    /// Only content digests are retained.
    HashOnly,
    /// Full content is retained, encrypted for dispute resolution.
    DisputeEncrypted,
}

/// Commitment classes recognized by [`crate::validate::validate_events`].
/// An event or decision naming a class outside this set is rejected.
pub const ALLOWED_COMMITMENT_CLASSES: &[&str] = &["billing", "refund", "scheduling", "disclosure"];

/// Event types required to appear at least once in `call_events.jsonl`.
pub const REQUIRED_EVENT_TYPES: &[&str] = &[
    "asr.final",
    "commitment.declared",
    "gate.decision",
    "tts.request",
    "tts.emitted",
    "tool.intent",
    "tool.result",
];

/// `call_payload.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallPayload {
    /// Identifier of the call this pack wraps.
    pub call_id: String,
    /// Fixed to the deterministic epoch.
    pub created_at: DateTime<Utc>,
    /// Retention policy applied to this call's evidence.
    pub privacy_mode: PrivacyMode,
    /// Number of records in `call_events.jsonl`.
    pub event_count: u64,
    /// Number of records in `commitments.jsonl`.
    pub commitment_count: u64,
}

/// `callpack_manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallpackManifest {
    /// Fixed to `"gait.callpack.manifest"`.
    pub schema_id: String,
    /// Fixed to `"1.0.0"`.
    pub schema_version: String,
    /// Must equal [`CallPayload::created_at`].
    pub created_at: DateTime<Utc>,
    /// Must equal [`CallPayload::call_id`].
    pub call_id: String,
    /// Must equal [`CallPayload::privacy_mode`].
    pub privacy_mode: PrivacyMode,
    /// Must equal [`CallPayload::event_count`].
    pub event_count: u64,
    /// Must equal [`CallPayload::commitment_count`].
    pub commitment_count: u64,
}

/// One line of `call_events.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    /// Monotonic sequence within the call, `>= 1`.
    pub call_seq: u64,
    /// Conversational turn this event belongs to, `>= 0`.
    pub turn_index: u64,
    /// Event type, e.g. `"tts.emitted"`.
    pub event_type: String,
    /// Commitment class this event pertains to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment_class: Option<String>,
    /// Say-token identifier this event emitted or references, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub say_token_id: Option<String>,
    /// Content digest attached to this event, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// One line of `commitments.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    /// Sequence of the declaring event.
    pub call_seq: u64,
    /// Conversational turn this commitment belongs to.
    pub turn_index: u64,
    /// Commitment class.
    pub commitment_class: String,
    /// Content digest of the committed statement, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// One line of `gate_decisions.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    /// Sequence of the deciding event.
    pub call_seq: u64,
    /// Conversational turn this decision belongs to.
    pub turn_index: u64,
    /// Commitment class this decision gates.
    pub commitment_class: String,
    /// Open-ended verdict string (`"block"`, `"deny"`, `"require_approval"`,
    /// ...); only `"allow"` authorizes the gated speak receipt, per the
    /// causality check in [`crate::validate`].
    pub verdict: String,
}

/// One line of `speak_receipts.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakReceipt {
    /// Sequence at which speech was authorized.
    pub call_seq: u64,
    /// Conversational turn this receipt belongs to.
    pub turn_index: u64,
    /// Commitment class authorized to be spoken.
    pub commitment_class: String,
    /// Say-token identifier this receipt authorizes.
    pub say_token_id: String,
}

/// `reference_digests.json`: content digests retained independent of
/// `privacy_mode`, keyed by an opaque label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDigests {
    /// Label to lowercase-hex-64 digest.
    pub entries: std::collections::BTreeMap<String, String>,
}
