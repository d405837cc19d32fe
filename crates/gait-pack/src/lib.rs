// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Pack: the outer bundle wrapping a run, job, or call payload under a
//! signed manifest and a hash-chained proof-record log.

mod builder;
mod types;
mod verifier;

pub use builder::{build_pack, BuiltPack, DEFAULT_PRODUCER_VERSION, SCHEMA_ID, SCHEMA_VERSION};
pub use types::{
    paths, ContentType, PackContentEntry, PackFile, PackManifest, PackType, ProofIntegrity, ProofRecord,
};
pub use verifier::{verify_pack, PackVerificationReport, PackVerifierOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use gait_core::{ContextEvidenceMode, RunId};
    use gait_runpack::{Intent, Refs, RunpackBuilder, ToolResult};

    fn sample_runpack_bytes() -> Vec<u8> {
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
            .build()
            .unwrap()
            .bytes
    }

    fn sample_created_at() -> chrono::DateTime<chrono::Utc> {
        use chrono::TimeZone;
        chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn run_pack_files() -> Vec<PackFile> {
        let run_payload = gait_canon::to_canonical_bytes(&serde_json::json!({
            "run_id": "run_pack_case",
        }))
        .unwrap();
        vec![
            PackFile::new(paths::RUN_PAYLOAD, run_payload, ContentType::Json),
            PackFile::new(paths::SOURCE_RUNPACK, sample_runpack_bytes(), ContentType::Zip),
        ]
    }

    #[test]
    fn run_pack_round_trips_and_verifies_clean() {
        let built = build_pack(
            PackType::Run,
            "run_pack_case".to_string(),
            DEFAULT_PRODUCER_VERSION,
            run_pack_files(),
            None,
        )
        .unwrap();
        assert_eq!(built.manifest.pack_type, PackType::Run);

        let report = verify_pack(&built.bytes, &PackVerifierOptions::default()).unwrap();
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.pack_id, built.manifest.pack_id);
    }

    #[test]
    fn building_twice_from_the_same_inputs_is_byte_identical() {
        let first = build_pack(
            PackType::Run,
            "run_pack_case".to_string(),
            DEFAULT_PRODUCER_VERSION,
            run_pack_files(),
            None,
        )
        .unwrap();
        let second = build_pack(
            PackType::Run,
            "run_pack_case".to_string(),
            DEFAULT_PRODUCER_VERSION,
            run_pack_files(),
            None,
        )
        .unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn flipping_one_byte_surfaces_exactly_one_hash_mismatch() {
        let built = build_pack(
            PackType::Run,
            "run_pack_case".to_string(),
            DEFAULT_PRODUCER_VERSION,
            run_pack_files(),
            None,
        )
        .unwrap();
        let mut entries = gait_archive::read_zip(&built.bytes).unwrap();
        let target = entries
            .iter_mut()
            .find(|e| e.path == paths::RUN_PAYLOAD)
            .unwrap();
        target.data[0] ^= 0xFF;
        let tampered = gait_archive::write_deterministic_zip(&entries).unwrap();

        let report = verify_pack(&tampered, &PackVerifierOptions::default()).unwrap();
        assert_eq!(report.hash_mismatches, vec![paths::RUN_PAYLOAD.to_string()]);
    }

    #[test]
    fn an_appended_undeclared_file_is_reported() {
        let built = build_pack(
            PackType::Run,
            "run_pack_case".to_string(),
            DEFAULT_PRODUCER_VERSION,
            run_pack_files(),
            None,
        )
        .unwrap();
        let mut entries = gait_archive::read_zip(&built.bytes).unwrap();
        entries.push(gait_archive::ArchiveEntry::new("extra.txt", b"surprise".to_vec()));
        let with_extra = gait_archive::write_deterministic_zip(&entries).unwrap();

        let report = verify_pack(&with_extra, &PackVerifierOptions::default()).unwrap();
        assert_eq!(report.undeclared_files, vec!["extra.txt".to_string()]);
    }

    #[test]
    fn signed_pack_verifies_with_the_matching_key() {
        let signing_key = gait_sign::generate_keypair();
        let verifying_key = signing_key.verifying_key();
        let built = build_pack(
            PackType::Run,
            "run_pack_case".to_string(),
            DEFAULT_PRODUCER_VERSION,
            run_pack_files(),
            Some(&signing_key),
        )
        .unwrap();

        let report = verify_pack(
            &built.bytes,
            &PackVerifierOptions {
                public_key: Some(verifying_key),
                require_signature: true,
            },
        )
        .unwrap();
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.signature_status, gait_core::SignatureStatus::Verified);
    }

    #[test]
    fn job_pack_missing_its_required_payload_files_is_flagged() {
        let job_payload =
            gait_canon::to_canonical_bytes(&serde_json::json!({"job_id": "job_1"})).unwrap();
        let built = build_pack(
            PackType::Job,
            "job_1".to_string(),
            DEFAULT_PRODUCER_VERSION,
            vec![PackFile::new(paths::JOB_PAYLOAD, job_payload, ContentType::Json)],
            None,
        )
        .unwrap();

        let report = verify_pack(&built.bytes, &PackVerifierOptions::default()).unwrap();
        assert!(!report.payload_contract_errors.is_empty());
        assert!(!report.is_clean());
    }

    #[test]
    fn tampering_with_one_proof_record_breaks_the_chain_from_that_point_on() {
        let built = build_pack(
            PackType::Job,
            "job_1".to_string(),
            DEFAULT_PRODUCER_VERSION,
            vec![
                PackFile::new(
                    paths::JOB_PAYLOAD,
                    gait_canon::to_canonical_bytes(&serde_json::json!({"job_id": "job_1"})).unwrap(),
                    ContentType::Json,
                ),
                PackFile::new(
                    paths::JOB_STATE,
                    gait_canon::to_canonical_bytes(&serde_json::json!({"status": "running"})).unwrap(),
                    ContentType::Json,
                ),
                PackFile::new(paths::JOB_EVENTS, b"".to_vec(), ContentType::Jsonl),
            ],
            None,
        )
        .unwrap();

        let mut entries = gait_archive::read_zip(&built.bytes).unwrap();
        let proof = entries
            .iter_mut()
            .find(|e| e.path == paths::PROOF_RECORDS)
            .unwrap();
        let mut text = String::from_utf8(proof.data.clone()).unwrap();
        text = text.replace("\"record_hash\":\"", "\"record_hash\":\"ff");
        proof.data = text.into_bytes();
        let tampered = gait_archive::write_deterministic_zip(&entries).unwrap();

        let report = verify_pack(&tampered, &PackVerifierOptions::default()).unwrap();
        assert!(!report.proof_chain_errors.is_empty());
    }
}
