// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Deterministic, explicitly-stubbed replay of a recorded runpack.
//!
//! Replay is diagnostic, not a build/verify gate: it never reaches out
//! to a real tool, the network, or the filesystem beyond the runpack
//! itself, and an intent with no matching stub is reported as
//! unresolved rather than failing the pass.

mod engine;
mod types;

pub use engine::ReplayEngine;
pub use types::{ReplayReport, ReplayedIntent, StubTable};
