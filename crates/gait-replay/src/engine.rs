// SPDX-License-Identifier: MIT OR Apache-2.0

//! The replay engine itself.

use crate::types::{ReplayReport, ReplayedIntent, StubTable};
use gait_runpack::ReadRunpack;

/// Re-walks a recorded runpack against a caller-supplied [`StubTable`],
/// comparing the canned stub outcome to what was actually recorded.
///
/// Replay never touches a real tool, network, or filesystem resource
/// beyond the runpack itself, and never fails: an intent with no
/// matching stub is reported as unresolved rather than as an error.
#[derive(Debug, Default)]
pub struct ReplayEngine;

impl ReplayEngine {
    /// Replays every intent in `runpack` against `stub_table`.
    #[must_use]
    pub fn replay(runpack: &ReadRunpack, stub_table: &StubTable) -> ReplayReport {
        let intents = runpack
            .intents
            .iter()
            .map(|intent| {
                let recorded_status = runpack
                    .result_for(&intent.intent_id)
                    .map(|result| result.status.clone());
                let replayed_status = stub_table
                    .lookup(&intent.tool)
                    .and_then(|stub| stub.get("status"))
                    .and_then(|status| status.as_str())
                    .map(str::to_string);
                let matched = match (&recorded_status, &replayed_status) {
                    (Some(recorded), Some(replayed)) => recorded == replayed,
                    _ => false,
                };
                ReplayedIntent {
                    intent_id: intent.intent_id.clone(),
                    recorded_status,
                    replayed_status,
                    matched,
                }
            })
            .collect();

        ReplayReport { intents }
    }
}
