// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Structural diffing of two runpacks, and reduction of a runpack down
//! to the single intent that triggers a chosen failure predicate.

mod diff;
mod reduce;
mod types;

pub use diff::diff_runpacks;
pub use reduce::reduce_to_minimal_failing_example;
pub use types::{DiffPrivacy, KeyedDiff, ReducePredicate, RunpackDiff};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gait_core::{ContextEvidenceMode, RunId};
    use gait_runpack::{ref_entry, Intent, ReadOptions, Refs, RunpackBuilder, ToolResult};

    fn created_at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn intent(id: &str, tool: &str) -> Intent {
        Intent {
            intent_id: id.to_string(),
            tool: tool.to_string(),
            args: serde_json::json!({"n": 1}),
        }
    }

    fn ok_result(id: &str) -> ToolResult {
        ToolResult {
            intent_id: id.to_string(),
            status: "ok".to_string(),
            result: serde_json::json!({"n": 1}),
        }
    }

    #[test]
    fn identical_runpacks_diff_clean() {
        let built = RunpackBuilder::new(RunId::new("run_a").unwrap(), created_at())
            .add_intent(intent("intent_1", "tool.echo"))
            .add_result(ok_result("intent_1"))
            .refs(Refs {
                context_set_digest: String::new(),
                context_evidence_mode: ContextEvidenceMode::BestEffort,
                entries: Vec::new(),
            })
            .build()
            .unwrap();
        let left = gait_runpack::read_runpack(&built.bytes, &ReadOptions::default()).unwrap();
        let right = gait_runpack::read_runpack(&built.bytes, &ReadOptions::default()).unwrap();

        let report = diff_runpacks(&left, &right, DiffPrivacy::Full).unwrap();
        assert!(!report.manifest_changed);
        assert!(report.intents.left_only.is_empty());
        assert!(report.intents.right_only.is_empty());
        assert!(report.intents.changed.is_empty());
        assert!(!report.refs_changed);
    }

    #[test]
    fn a_changed_intent_argument_is_reported_under_full_but_not_metadata() {
        let left_built = RunpackBuilder::new(RunId::new("run_a").unwrap(), created_at())
            .add_intent(intent("intent_1", "tool.echo"))
            .add_result(ok_result("intent_1"))
            .build()
            .unwrap();
        let mut right_intent = intent("intent_1", "tool.echo");
        right_intent.args = serde_json::json!({"n": 2});
        let right_built = RunpackBuilder::new(RunId::new("run_b").unwrap(), created_at())
            .add_intent(right_intent)
            .add_result(ok_result("intent_1"))
            .build()
            .unwrap();

        let left = gait_runpack::read_runpack(&left_built.bytes, &ReadOptions::default()).unwrap();
        let right = gait_runpack::read_runpack(&right_built.bytes, &ReadOptions::default()).unwrap();

        let full = diff_runpacks(&left, &right, DiffPrivacy::Full).unwrap();
        assert_eq!(full.intents.changed, vec!["intent_1".to_string()]);

        let metadata = diff_runpacks(&left, &right, DiffPrivacy::Metadata).unwrap();
        assert!(metadata.intents.changed.is_empty());
    }

    #[test]
    fn reduce_picks_the_lexicographically_smallest_failing_intent() {
        let built = RunpackBuilder::new(RunId::new("run_multi").unwrap(), created_at())
            .add_intent(intent("intent_b", "tool.echo"))
            .add_result(ok_result("intent_b"))
            .add_intent(intent("intent_a", "tool.fail"))
            .add_result(ToolResult {
                intent_id: "intent_a".to_string(),
                status: "error".to_string(),
                result: serde_json::json!({"reason": "boom"}),
            })
            .refs(Refs {
                context_set_digest: String::new(),
                context_evidence_mode: ContextEvidenceMode::BestEffort,
                entries: vec![ref_entry("intent_a", "deadbeef"), ref_entry("intent_b", "cafef00d")],
            })
            .build()
            .unwrap();
        let read = gait_runpack::read_runpack(&built.bytes, &ReadOptions::default()).unwrap();

        let reduced = reduce_to_minimal_failing_example(
            &read,
            ReducePredicate::NonOkStatus,
            "0.0.0-dev",
            None,
        )
        .unwrap();
        let reread = gait_runpack::read_runpack(&reduced.bytes, &ReadOptions::default()).unwrap();
        assert_eq!(reread.intents.len(), 1);
        assert_eq!(reread.intents[0].intent_id, "intent_a");
        assert_eq!(reread.result_for("intent_a").unwrap().status, "error");
        assert_eq!(reread.refs.entries.len(), 1);
        assert_eq!(reread.refs.entries[0].id, "intent_a");
    }

    #[test]
    fn reduce_with_no_matching_intent_errors() {
        let built = RunpackBuilder::new(RunId::new("run_clean").unwrap(), created_at())
            .add_intent(intent("intent_1", "tool.echo"))
            .add_result(ok_result("intent_1"))
            .build()
            .unwrap();
        let read = gait_runpack::read_runpack(&built.bytes, &ReadOptions::default()).unwrap();

        let result = reduce_to_minimal_failing_example(
            &read,
            ReducePredicate::MissingResult,
            "0.0.0-dev",
            None,
        );
        assert!(result.is_err());
    }
}
