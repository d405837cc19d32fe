// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Call pack: the `call` pack variant's cross-file invariants layered on
//! top of the common outer-pack machinery.

mod builder;
mod types;
mod validate;
mod verify;

pub use builder::{build_callpack, CallpackInputs, SCHEMA_ID, SCHEMA_VERSION};
pub use types::{
    CallEvent, CallPayload, CallpackManifest, Commitment, GateDecision, PrivacyMode,
    ReferenceDigests, SpeakReceipt, ALLOWED_COMMITMENT_CLASSES, REQUIRED_EVENT_TYPES,
};
pub use validate::{validate_callpack, CallpackValidationReport};
pub use verify::{verify_callpack, CallpackVerificationReport};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gait_core::{ContextEvidenceMode, RunId};
    use gait_error::GaitError;
    use gait_pack::PackVerifierOptions;
    use gait_runpack::{Intent, Refs, RunpackBuilder, ToolResult};

    fn created_at() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn sample_runpack_bytes() -> Vec<u8> {
        RunpackBuilder::new(RunId::new("run_call_case").unwrap(), created_at())
            .add_intent(Intent {
                intent_id: "intent_1".to_string(),
                tool: "tool.echo".to_string(),
                args: serde_json::json!({}),
            })
            .add_result(ToolResult {
                intent_id: "intent_1".to_string(),
                status: "ok".to_string(),
                result: serde_json::json!({}),
            })
            .refs(Refs {
                context_set_digest: String::new(),
                context_evidence_mode: ContextEvidenceMode::BestEffort,
                entries: Vec::new(),
            })
            .build()
            .unwrap()
            .bytes
    }

    fn required_events(allowed_say_token: &str) -> Vec<CallEvent> {
        REQUIRED_EVENT_TYPES
            .iter()
            .enumerate()
            .map(|(i, ty)| CallEvent {
                call_seq: (i + 1) as u64,
                turn_index: 0,
                event_type: (*ty).to_string(),
                commitment_class: if *ty == "tts.emitted" {
                    Some("billing".to_string())
                } else {
                    None
                },
                say_token_id: if *ty == "tts.emitted" {
                    Some(allowed_say_token.to_string())
                } else {
                    None
                },
                digest: None,
            })
            .collect()
    }

    fn base_inputs() -> CallpackInputs {
        CallpackInputs {
            call_id: "call_1".to_string(),
            created_at: created_at(),
            privacy_mode: PrivacyMode::HashOnly,
            events: required_events("tok_1"),
            commitments: vec![Commitment {
                call_seq: 2,
                turn_index: 0,
                commitment_class: "billing".to_string(),
                digest: None,
            }],
            gate_decisions: vec![GateDecision {
                call_seq: 3,
                turn_index: 0,
                commitment_class: "billing".to_string(),
                verdict: "allow".to_string(),
            }],
            speak_receipts: vec![SpeakReceipt {
                call_seq: 5,
                turn_index: 0,
                commitment_class: "billing".to_string(),
                say_token_id: "tok_1".to_string(),
            }],
            reference_digests: ReferenceDigests { entries: Default::default() },
            runpack_bytes: sample_runpack_bytes(),
        }
    }

    #[test]
    fn a_well_formed_call_pack_verifies_clean() {
        let built = build_callpack(base_inputs(), "0.0.0-dev", None).unwrap();
        let report = verify_callpack(&built.bytes, &PackVerifierOptions::default()).unwrap();
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn a_speak_receipt_without_a_preceding_allow_is_rejected() {
        let mut inputs = base_inputs();
        inputs.gate_decisions = vec![GateDecision {
            call_seq: 3,
            turn_index: 0,
            commitment_class: "billing".to_string(),
            verdict: "deny".to_string(),
        }];
        let err = build_callpack(inputs, "0.0.0-dev", None).unwrap_err();
        match err {
            GaitError::VerificationFailed { message, .. } => {
                assert!(message.contains("was not authorized"), "{message}");
            }
            other => panic!("expected VerificationFailed, got {other:?}"),
        }
    }

    #[test]
    fn a_missing_required_event_type_is_rejected() {
        let mut inputs = base_inputs();
        inputs.events.retain(|e| e.event_type != "tool.result");
        let err = build_callpack(inputs, "0.0.0-dev", None).unwrap_err();
        match err {
            GaitError::VerificationFailed { message, .. } => {
                assert!(message.contains("tool.result"), "{message}");
            }
            other => panic!("expected VerificationFailed, got {other:?}"),
        }
    }

    #[test]
    fn tampering_with_the_verified_pack_surfaces_a_gated_emit_error() {
        let built = build_callpack(base_inputs(), "0.0.0-dev", None).unwrap();
        let mut entries = gait_archive::read_zip(&built.bytes).unwrap();
        let receipts = entries
            .iter_mut()
            .find(|e| e.path == gait_pack::paths::SPEAK_RECEIPTS)
            .unwrap();
        receipts.data = b"".to_vec();
        let tampered = gait_archive::write_deterministic_zip(&entries).unwrap();

        let report = verify_callpack(&tampered, &PackVerifierOptions::default()).unwrap();
        assert!(!report.call.gated_emit_errors.is_empty());
        assert!(!report.is_clean());
    }
}
