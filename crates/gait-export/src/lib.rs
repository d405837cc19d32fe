// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Flat, SQL-index-friendly export rows derived from a verified pack.
//!
//! `build_export_records` is pure data transformation: it never opens a
//! pack itself, so it stays trivially testable in isolation from
//! `gait-pack`'s archive/signature handling.

mod builder;
mod types;

pub use builder::build_export_records;
pub use types::ExportRecord;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gait_core::RunId;
    use gait_pack::{paths, ContentType, PackFile, PackType, ProofRecord};
    use gait_runpack::{Intent, RunpackBuilder, ToolResult};

    fn created_at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn sample_pack() -> (gait_pack::PackManifest, Vec<ProofRecord>) {
        let runpack = RunpackBuilder::new(RunId::new("run_export").unwrap(), created_at())
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
            .build()
            .unwrap();

        let files = vec![
            PackFile::new(paths::RUN_PAYLOAD, b"{}".to_vec(), ContentType::Json),
            PackFile::new(paths::SOURCE_RUNPACK, runpack.bytes, ContentType::Zip),
        ];
        let built = gait_pack::build_pack(PackType::Run, "run_export".to_string(), "0.0.0-dev", files, None).unwrap();

        let entries = gait_archive::read_zip(&built.bytes).unwrap();
        let proof_entry = entries.iter().find(|e| e.path == paths::PROOF_RECORDS).unwrap();
        let proof_chain: Vec<ProofRecord> = std::str::from_utf8(&proof_entry.data)
            .unwrap()
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        (built.manifest, proof_chain)
    }

    #[test]
    fn one_export_record_per_proof_chain_entry() {
        let (manifest, proof_chain) = sample_pack();
        let records = build_export_records(&manifest, &proof_chain);

        assert_eq!(records.len(), proof_chain.len());
        for (index, record) in records.iter().enumerate() {
            assert_eq!(record.pack_id, manifest.pack_id);
            assert_eq!(record.pack_type, PackType::Run);
            assert_eq!(record.record_index, index);
            assert!(record.signing_key_id.is_none());
        }
        let entry_paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert!(entry_paths.contains(&paths::RUN_PAYLOAD));
        assert!(entry_paths.contains(&paths::SOURCE_RUNPACK));
    }

    #[test]
    fn an_empty_proof_chain_yields_no_records() {
        let (manifest, _) = sample_pack();
        let records = build_export_records(&manifest, &[]);
        assert!(records.is_empty());
    }
}
