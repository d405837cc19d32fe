// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Facade crate re-exporting the `gait` workspace members.

pub use gait_callpack;
pub use gait_core;
pub use gait_diff;
pub use gait_export;
pub use gait_pack;
pub use gait_replay;
pub use gait_runpack;
pub use gait_session;
