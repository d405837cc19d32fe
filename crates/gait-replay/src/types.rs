// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stub tables and report shapes for deterministic replay.

use serde_json::Value;
use std::collections::BTreeMap;

/// Maps a tool name to the canned result payload it should replay as.
#[derive(Debug, Clone, Default)]
pub struct StubTable {
    stubs: BTreeMap<String, Value>,
}

impl StubTable {
    /// An empty stub table: every intent will be `unresolved`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stub payload for `tool`.
    #[must_use]
    pub fn with_stub(mut self, tool: impl Into<String>, payload: Value) -> Self {
        self.stubs.insert(tool.into(), payload);
        self
    }

    /// Looks up the stub payload registered for `tool`, if any.
    #[must_use]
    pub fn lookup(&self, tool: &str) -> Option<&Value> {
        self.stubs.get(tool)
    }
}

/// Outcome of replaying a single intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedIntent {
    /// The intent that was replayed.
    pub intent_id: String,
    /// The status recorded in `results.jsonl` at capture time, if any.
    pub recorded_status: Option<String>,
    /// The status the stub table would have produced, or `None` if no
    /// stub was registered for this intent's tool.
    pub replayed_status: Option<String>,
    /// `true` if `recorded_status` and `replayed_status` agree and both
    /// are present.
    pub matched: bool,
}

/// Full report produced by [`crate::engine::ReplayEngine::replay`].
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    /// One entry per intent in `intents.jsonl`, in file order.
    pub intents: Vec<ReplayedIntent>,
}

impl ReplayReport {
    /// Intents for which no stub matched their tool name.
    #[must_use]
    pub fn unresolved(&self) -> Vec<&ReplayedIntent> {
        self.intents
            .iter()
            .filter(|i| i.replayed_status.is_none())
            .collect()
    }

    /// Intents whose recorded and replayed status disagree.
    #[must_use]
    pub fn mismatched(&self) -> Vec<&ReplayedIntent> {
        self.intents
            .iter()
            .filter(|i| i.replayed_status.is_some() && !i.matched)
            .collect()
    }
}
