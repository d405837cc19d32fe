// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checkpoint-chain verification: recomputes every `checkpoint_digest`,
//! checks linkage, and cross-checks each checkpoint's embedded runpack.

use crate::types::checkpoint_digest;
use gait_error::GaitResult;
use gait_runpack::RunpackVerifierOptions;
use std::path::Path;

/// Structured result of [`verify_chain`].
#[derive(Debug, Clone, Default)]
pub struct SessionChainReport {
    /// Problems linking one checkpoint to the next.
    pub linkage_errors: Vec<String>,
    /// Problems verifying an individual checkpoint's runpack.
    pub checkpoint_errors: Vec<String>,
}

impl SessionChainReport {
    /// `true` only when no problems were found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.linkage_errors.is_empty() && self.checkpoint_errors.is_empty()
    }
}

/// Verifies every checkpoint in `journal_path`'s chain, reading each
/// checkpoint's runpack from disk and checking its manifest digest
/// against the checkpoint's recorded `manifest_digest`.
///
/// # Errors
///
/// Returns an I/O error only if the journal itself cannot be read; every
/// other problem is collected into the returned report.
pub fn verify_chain(journal_path: &Path, options: &RunpackVerifierOptions) -> GaitResult<SessionChainReport> {
    let _span = tracing::info_span!("gait_session.verify_chain", journal_path = %journal_path.display()).entered();

    let read = crate::journal::read_journal(journal_path)?;

    let mut linkage_errors = Vec::new();
    let mut checkpoint_errors = Vec::new();
    let mut previous_digest = String::new();
    let mut previous_sequence_end = 0u64;

    for checkpoint in &read.checkpoints {
        if checkpoint.prev_checkpoint_digest != previous_digest {
            linkage_errors.push(format!(
                "checkpoint {} does not link to the previous checkpoint_digest",
                checkpoint.checkpoint_index
            ));
        }
        if checkpoint.sequence_start <= previous_sequence_end {
            linkage_errors.push(format!(
                "checkpoint {} sequence_start {} overlaps the previous checkpoint",
                checkpoint.checkpoint_index, checkpoint.sequence_start
            ));
        }
        let recomputed = checkpoint_digest(
            &checkpoint.manifest_digest,
            &checkpoint.prev_checkpoint_digest,
            checkpoint.checkpoint_index,
            checkpoint.sequence_start,
            checkpoint.sequence_end,
        );
        if recomputed != checkpoint.checkpoint_digest {
            linkage_errors.push(format!(
                "checkpoint {} checkpoint_digest does not recompute",
                checkpoint.checkpoint_index
            ));
        }

        match std::fs::read(&checkpoint.runpack_path) {
            Ok(bytes) => match gait_runpack::verify_runpack(&bytes, options) {
                Ok(report) => {
                    if report.manifest_digest != checkpoint.manifest_digest {
                        checkpoint_errors.push(format!(
                            "checkpoint {} manifest_digest disagrees with its runpack",
                            checkpoint.checkpoint_index
                        ));
                    }
                    if !report.is_clean() {
                        checkpoint_errors.push(format!(
                            "checkpoint {} runpack failed verification",
                            checkpoint.checkpoint_index
                        ));
                    }
                }
                Err(e) => checkpoint_errors.push(format!(
                    "checkpoint {} runpack could not be read: {e}",
                    checkpoint.checkpoint_index
                )),
            },
            Err(e) => checkpoint_errors.push(format!(
                "checkpoint {} runpack_path {} could not be opened: {e}",
                checkpoint.checkpoint_index, checkpoint.runpack_path
            )),
        }

        previous_digest = checkpoint.checkpoint_digest.clone();
        previous_sequence_end = checkpoint.sequence_end;
    }

    linkage_errors.sort();
    checkpoint_errors.sort();

    tracing::debug!(
        target: "gait.session",
        linkage_errors = linkage_errors.len(),
        checkpoint_errors = checkpoint_errors.len(),
        "verified checkpoint chain"
    );

    Ok(SessionChainReport { linkage_errors, checkpoint_errors })
}
