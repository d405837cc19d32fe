// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Runpack: the innermost bundle recording one agent run.
//!
//! A runpack couples four canonical JSON(L) files — `run.json`,
//! `intents.jsonl`, `results.jsonl`, `refs.json` — under a manifest that
//! hashes and, optionally, signs them, then writes the set as a
//! deterministic zip.

mod builder;
mod reader;
mod types;
mod verifier;

pub use builder::{ref_entry, BuiltRunpack, RunpackBuilder, DEFAULT_PRODUCER_VERSION, SCHEMA_ID, SCHEMA_VERSION};
pub use reader::{read_runpack, ReadOptions, ReadRunpack};
pub use types::{paths, Intent, RefEntry, Refs, RunMetadata, RunpackManifest, TimelineEvent, ToolResult};
pub use verifier::{verify_runpack, RunpackVerificationReport, RunpackVerifierOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gait_core::{ContextEvidenceMode, RunId};

    fn sample_created_at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn sample_builder() -> RunpackBuilder {
        RunpackBuilder::new(RunId::new("run_pack_case").unwrap(), sample_created_at())
            .add_intent(Intent {
                intent_id: "intent_1".to_string(),
                tool: "tool.echo".to_string(),
                args: serde_json::json!({"text": "hi"}),
            })
            .add_result(ToolResult {
                intent_id: "intent_1".to_string(),
                status: "ok".to_string(),
                result: serde_json::json!({"text": "hi"}),
            })
            .refs(Refs {
                context_set_digest: String::new(),
                context_evidence_mode: ContextEvidenceMode::BestEffort,
                entries: Vec::new(),
            })
    }

    #[test]
    fn round_trip_run_pack_scenario() {
        let built = sample_builder().build().unwrap();
        let read_back = read_runpack(&built.bytes, &ReadOptions::default()).unwrap();
        assert_eq!(read_back.intents.len(), 1);
        assert_eq!(read_back.results.len(), 1);
        assert_eq!(read_back.result_for("intent_1").unwrap().status, "ok");

        let report = verify_runpack(&built.bytes, &RunpackVerifierOptions::default()).unwrap();
        assert!(report.missing_files.is_empty());
        assert!(report.hash_mismatches.is_empty());
        assert!(report.manifest_digest_ok);
    }

    #[test]
    fn deterministic_bytes_scenario() {
        let first = sample_builder().build().unwrap();
        let second = sample_builder().build().unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn flipping_one_byte_surfaces_exactly_one_hash_mismatch() {
        let built = sample_builder().build().unwrap();
        let mut entries = gait_archive::read_zip(&built.bytes).unwrap();
        let target = entries
            .iter_mut()
            .find(|e| e.path == paths::RESULTS)
            .unwrap();
        target.data[0] ^= 0xFF;
        let tampered = gait_archive::write_deterministic_zip(&entries).unwrap();

        let report = verify_runpack(&tampered, &RunpackVerifierOptions::default()).unwrap();
        assert_eq!(report.hash_mismatches, vec![paths::RESULTS.to_string()]);
    }

    #[test]
    fn required_context_evidence_without_digest_is_rejected() {
        let builder = RunpackBuilder::new(RunId::new("run_x").unwrap(), sample_created_at()).refs(
            Refs {
                context_set_digest: String::new(),
                context_evidence_mode: ContextEvidenceMode::Required,
                entries: Vec::new(),
            },
        );
        assert!(builder.build().is_err());
    }

    #[test]
    fn signed_runpack_verifies_with_the_matching_key() {
        let signing_key = gait_sign::generate_keypair();
        let verifying_key = signing_key.verifying_key();
        let built = sample_builder().sign_with(signing_key).build().unwrap();

        let report = verify_runpack(
            &built.bytes,
            &RunpackVerifierOptions {
                public_key: Some(verifying_key),
                require_signature: true,
            },
        )
        .unwrap();
        assert_eq!(report.signature_status, gait_core::SignatureStatus::Verified);
        assert!(report.is_clean());
    }

    #[test]
    fn a_hand_crafted_archive_with_required_evidence_and_an_empty_digest_is_rejected() {
        use crate::types::RunMetadata;
        use gait_core::{CaptureMode, FileHashEntry};

        let run_id = RunId::new("run_tampered").unwrap();
        let run_metadata = RunMetadata {
            run_id: run_id.clone(),
            environment: serde_json::Value::Object(serde_json::Map::new()),
            timeline: Vec::new(),
        };
        let intents: Vec<Intent> = Vec::new();
        let results: Vec<ToolResult> = Vec::new();
        let refs = Refs {
            context_set_digest: String::new(),
            context_evidence_mode: ContextEvidenceMode::Required,
            entries: Vec::new(),
        };

        let run_bytes = gait_canon::to_canonical_bytes(&run_metadata).unwrap();
        let intents_bytes: Vec<u8> = Vec::new();
        let results_bytes: Vec<u8> = Vec::new();
        let refs_bytes = gait_canon::to_canonical_bytes(&refs).unwrap();

        let mut files = vec![
            FileHashEntry {
                path: paths::RUN.to_string(),
                sha256: gait_canon::sha256_hex(&run_bytes),
            },
            FileHashEntry {
                path: paths::INTENTS.to_string(),
                sha256: gait_canon::sha256_hex(&intents_bytes),
            },
            FileHashEntry {
                path: paths::RESULTS.to_string(),
                sha256: gait_canon::sha256_hex(&results_bytes),
            },
            FileHashEntry {
                path: paths::REFS.to_string(),
                sha256: gait_canon::sha256_hex(&refs_bytes),
            },
        ];
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut manifest = RunpackManifest {
            schema_id: SCHEMA_ID.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: sample_created_at(),
            producer_version: DEFAULT_PRODUCER_VERSION.to_string(),
            run_id,
            capture_mode: CaptureMode::Reference,
            files,
            manifest_digest: String::new(),
            signatures: Vec::new(),
        };
        let digest_bytes = gait_canon::to_canonical_bytes(&manifest.cleared_for_digest()).unwrap();
        manifest.manifest_digest = gait_canon::sha256_hex(&digest_bytes);
        let manifest_bytes = gait_canon::to_canonical_bytes(&manifest).unwrap();

        let entries = vec![
            gait_archive::ArchiveEntry::new(paths::MANIFEST, manifest_bytes),
            gait_archive::ArchiveEntry::new(paths::RUN, run_bytes),
            gait_archive::ArchiveEntry::new(paths::INTENTS, intents_bytes),
            gait_archive::ArchiveEntry::new(paths::RESULTS, results_bytes),
            gait_archive::ArchiveEntry::new(paths::REFS, refs_bytes),
        ];
        let bytes = gait_archive::write_deterministic_zip(&entries).unwrap();

        assert!(read_runpack(&bytes, &ReadOptions::default()).is_err());

        let report = verify_runpack(&bytes, &RunpackVerifierOptions::default()).unwrap();
        assert!(!report.refs_context_evidence_ok);
        assert!(!report.is_clean());
    }

    #[test]
    fn undeclared_file_appended_to_an_archive_is_detected_by_a_higher_layer() {
        // gait-runpack's own verifier only inspects declared files; detecting
        // undeclared extras is the pack verifier's job (see gait-pack).
        let built = sample_builder().build().unwrap();
        let mut entries = gait_archive::read_zip(&built.bytes).unwrap();
        entries.push(gait_archive::ArchiveEntry::new("extra.txt", b"surprise".to_vec()));
        let with_extra = gait_archive::write_deterministic_zip(&entries).unwrap();
        let report = verify_runpack(&with_extra, &RunpackVerifierOptions::default()).unwrap();
        assert!(report.is_clean());
    }
}
