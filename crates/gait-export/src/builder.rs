// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure derivation of export rows from an already-verified pack.

use crate::types::ExportRecord;
use gait_pack::{PackManifest, ProofRecord};

/// Derives one [`ExportRecord`] per proof-chain entry.
///
/// Never opens a pack itself: the caller is expected to have already
/// verified `pack_manifest`/`proof_chain` with `gait-pack`.
#[must_use]
pub fn build_export_records(pack_manifest: &PackManifest, proof_chain: &[ProofRecord]) -> Vec<ExportRecord> {
    proof_chain
        .iter()
        .enumerate()
        .map(|(record_index, record)| ExportRecord {
            pack_id: pack_manifest.pack_id.clone(),
            pack_type: pack_manifest.pack_type,
            path: record.path.clone(),
            sha256: record.sha256.clone(),
            entry_type: record.content_type,
            record_index,
            signing_key_id: record.integrity.signing_key_id.clone(),
        })
        .collect()
}
