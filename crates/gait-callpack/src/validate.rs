// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-file invariants a call pack must satisfy beyond the common
//! pack-level file-hash and proof-chain checks.

use crate::types::{
    CallEvent, CallPayload, CallpackManifest, Commitment, GateDecision, SpeakReceipt,
    ALLOWED_COMMITMENT_CLASSES, REQUIRED_EVENT_TYPES,
};

/// Report produced by [`validate_callpack`].
#[derive(Debug, Clone, Default)]
pub struct CallpackValidationReport {
    /// Problems found normalizing individual events (out-of-range
    /// sequence numbers, disallowed commitment classes, malformed
    /// digests).
    pub normalization_errors: Vec<String>,
    /// Required event types absent from `call_events.jsonl`.
    pub missing_event_types: Vec<String>,
    /// Speak receipts lacking a causally-preceding `allow` decision.
    pub causality_errors: Vec<String>,
    /// `tts.emitted` events lacking a matching, authorizing speak receipt.
    pub gated_emit_errors: Vec<String>,
    /// Disagreements between `call_payload.json` and
    /// `callpack_manifest.json`.
    pub manifest_consistency_errors: Vec<String>,
}

impl CallpackValidationReport {
    /// `true` only when every cross-file invariant held.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.normalization_errors.is_empty()
            && self.missing_event_types.is_empty()
            && self.causality_errors.is_empty()
            && self.gated_emit_errors.is_empty()
            && self.manifest_consistency_errors.is_empty()
    }
}

/// Lowercases `commitment_class` and `digest` fields in place and reports
/// any event that fails a structural constraint (`call_seq >= 1`, a
/// digest that is not 64 lowercase hex characters, or a commitment class
/// outside [`ALLOWED_COMMITMENT_CLASSES`]).
pub fn normalize_events(events: &mut [CallEvent]) -> Vec<String> {
    let mut errors = Vec::new();
    for event in events.iter_mut() {
        if event.call_seq < 1 {
            errors.push(format!("event at turn {} has call_seq < 1", event.turn_index));
        }
        if let Some(class) = event.commitment_class.take() {
            let lowered = class.to_ascii_lowercase();
            if !ALLOWED_COMMITMENT_CLASSES.contains(&lowered.as_str()) {
                errors.push(format!(
                    "event call_seq={} names an unrecognized commitment_class: {lowered}",
                    event.call_seq
                ));
            }
            event.commitment_class = Some(lowered);
        }
        if let Some(digest) = event.digest.take() {
            let lowered = digest.to_ascii_lowercase();
            if !is_lowercase_hex64(&lowered) {
                errors.push(format!(
                    "event call_seq={} has a malformed digest: {lowered}",
                    event.call_seq
                ));
            }
            event.digest = Some(lowered);
        }
    }
    events.sort_by(|a, b| (a.call_seq, &a.event_type).cmp(&(b.call_seq, &b.event_type)));
    errors.sort();
    errors
}

fn is_lowercase_hex64(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

fn required_event_types_present(events: &[CallEvent]) -> Vec<String> {
    let present: std::collections::BTreeSet<&str> =
        events.iter().map(|e| e.event_type.as_str()).collect();
    let mut missing: Vec<String> = REQUIRED_EVENT_TYPES
        .iter()
        .filter(|required| !present.contains(*required))
        .map(|required| (*required).to_string())
        .collect();
    missing.sort();
    missing
}

/// For each speak receipt, the most recent (by `call_seq`) gate decision
/// sharing its `(commitment_class, turn_index)` and not occurring after
/// it must have allowed speech.
fn causality_errors(gate_decisions: &[GateDecision], speak_receipts: &[SpeakReceipt]) -> Vec<String> {
    let mut errors = Vec::new();
    for receipt in speak_receipts {
        let preceding = gate_decisions.iter().filter(|d| {
            d.commitment_class == receipt.commitment_class
                && d.turn_index == receipt.turn_index
                && d.call_seq <= receipt.call_seq
        });
        match preceding.max_by_key(|d| d.call_seq) {
            None => errors.push(format!(
                "speak_receipt (turn_index={}, call_seq={}, class={}) has no preceding gate decision",
                receipt.turn_index, receipt.call_seq, receipt.commitment_class
            )),
            Some(latest) if latest.verdict != "allow" => errors.push(format!(
                "speak_receipt (turn_index={}, call_seq={}, class={}) was not authorized: latest decision was {}",
                receipt.turn_index, receipt.call_seq, receipt.commitment_class, latest.verdict
            )),
            Some(_) => {}
        }
    }
    errors.sort();
    errors
}

/// Every gated `tts.emitted` event must carry a `say_token_id` and have a
/// receipt whose `(call_seq, turn_index, commitment_class)` matches and
/// whose `say_token_id` agrees.
fn gated_emit_errors(events: &[CallEvent], speak_receipts: &[SpeakReceipt]) -> Vec<String> {
    let mut errors = Vec::new();
    for event in events {
        if event.event_type != "tts.emitted" {
            continue;
        }
        let Some(class) = event.commitment_class.as_ref().filter(|c| !c.is_empty()) else {
            continue;
        };
        let Some(say_token_id) = event.say_token_id.as_ref().filter(|s| !s.is_empty()) else {
            errors.push(format!(
                "tts.emitted at call_seq={} names commitment_class {class} but carries no say_token_id",
                event.call_seq
            ));
            continue;
        };
        let matched = speak_receipts.iter().any(|r| {
            r.call_seq == event.call_seq
                && r.turn_index == event.turn_index
                && &r.commitment_class == class
                && &r.say_token_id == say_token_id
        });
        if !matched {
            errors.push(format!(
                "tts.emitted at call_seq={} (class={class}, say_token_id={say_token_id}) has no matching speak receipt",
                event.call_seq
            ));
        }
    }
    errors.sort();
    errors
}

fn manifest_consistency_errors(payload: &CallPayload, manifest: &CallpackManifest) -> Vec<String> {
    let mut errors = Vec::new();
    if payload.call_id != manifest.call_id {
        errors.push("call_id differs between call_payload.json and callpack_manifest.json".to_string());
    }
    if payload.created_at != manifest.created_at {
        errors.push("created_at differs between call_payload.json and callpack_manifest.json".to_string());
    }
    if payload.privacy_mode != manifest.privacy_mode {
        errors.push("privacy_mode differs between call_payload.json and callpack_manifest.json".to_string());
    }
    if payload.event_count != manifest.event_count {
        errors.push("event_count differs between call_payload.json and callpack_manifest.json".to_string());
    }
    if payload.commitment_count != manifest.commitment_count {
        errors.push("commitment_count differs between call_payload.json and callpack_manifest.json".to_string());
    }
    errors.sort();
    errors
}

/// Runs every cross-file call-pack invariant against already-parsed
/// records. `events` is expected to already be normalized via
/// [`normalize_events`]; any normalization errors should be folded into
/// the returned report by the caller.
#[must_use]
pub fn validate_callpack(
    payload: &CallPayload,
    manifest: &CallpackManifest,
    events: &[CallEvent],
    _commitments: &[Commitment],
    gate_decisions: &[GateDecision],
    speak_receipts: &[SpeakReceipt],
) -> CallpackValidationReport {
    CallpackValidationReport {
        normalization_errors: Vec::new(),
        missing_event_types: required_event_types_present(events),
        causality_errors: causality_errors(gate_decisions, speak_receipts),
        gated_emit_errors: gated_emit_errors(events, speak_receipts),
        manifest_consistency_errors: manifest_consistency_errors(payload, manifest),
    }
}
