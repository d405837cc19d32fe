// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat export row shape.

use gait_pack::{ContentType, PackType};

/// One flat, SQL-index-friendly row derived from a verified pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    /// Content-addressed identifier of the pack this row belongs to.
    pub pack_id: String,
    /// Which variant the pack wraps.
    pub pack_type: PackType,
    /// Archive-relative path of the attested entry.
    pub path: String,
    /// SHA-256 of the attested entry's bytes.
    pub sha256: String,
    /// Content type of the attested entry.
    pub entry_type: ContentType,
    /// Position of this entry's proof record within the chain.
    pub record_index: usize,
    /// Key id the entry's proof record was signed with, if any.
    pub signing_key_id: Option<String>,
}
