// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Byte-deterministic zip archive construction.
//!
//! Two calls to [`write_deterministic_zip`] with an equal (unordered) set of
//! entries produce byte-equal output: entries are sorted by path, every
//! entry is stamped with the fixed timestamp `1980-01-01T00:00:00Z`
//! (conveniently also the zip format's minimum DOS-date epoch), external
//! attributes come from the caller's declared mode, and a single
//! compression method is used throughout. `extra` fields are left at their
//! zero default rather than populated with filesystem-specific data.

use gait_error::{GaitError, GaitResult};
use std::io::{Cursor, Read, Write};

/// Maximum permitted size, in bytes, of a single zip entry (100 MiB).
pub const MAX_ENTRY_BYTES: u64 = 100 * 1024 * 1024;

/// Unix mode applied to normalized entries whose original mode is unknown.
pub const DEFAULT_FILE_MODE: u32 = 0o100644;

/// One file to be written into (or read out of) a deterministic archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Archive-relative path, using forward slashes.
    pub path: String,
    /// Raw file contents.
    pub data: Vec<u8>,
    /// Unix file mode stamped as the entry's external attributes.
    pub mode: u32,
}

impl ArchiveEntry {
    /// Builds a new entry with the workspace's default file mode.
    #[must_use]
    pub fn new(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
            mode: DEFAULT_FILE_MODE,
        }
    }
}

fn deterministic_datetime() -> zip::DateTime {
    zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0)
        .expect("1980-01-01T00:00:00 is a valid DOS date")
}

/// Writes `entries` into zip bytes, deterministically.
///
/// Entries are sorted by path before writing regardless of input order, so
/// the same logical entry set always yields byte-equal output.
///
/// # Errors
///
/// Returns [`GaitError::EntryTooLarge`] if any entry exceeds
/// [`MAX_ENTRY_BYTES`], or [`GaitError::Io`] if the underlying zip writer
/// fails.
pub fn write_deterministic_zip(entries: &[ArchiveEntry]) -> GaitResult<Vec<u8>> {
    let _span = tracing::info_span!("gait_archive.write_deterministic_zip", entry_count = entries.len()).entered();

    let mut sorted: Vec<&ArchiveEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let timestamp = deterministic_datetime();
        for entry in &sorted {
            if entry.data.len() as u64 > MAX_ENTRY_BYTES {
                return Err(GaitError::EntryTooLarge {
                    path: entry.path.clone(),
                    max_bytes: MAX_ENTRY_BYTES,
                });
            }
            let options = zip::write::FileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated)
                .unix_permissions(entry.mode)
                .last_modified_time(timestamp);
            writer
                .start_file(entry.path.clone(), options)
                .map_err(zip_to_gait_error)?;
            writer.write_all(&entry.data).map_err(GaitError::from)?;
        }
        writer.finish().map_err(zip_to_gait_error)?;
    }
    let bytes = buffer.into_inner();
    tracing::debug!(target: "gait.archive", bytes = bytes.len(), "wrote deterministic zip");
    Ok(bytes)
}

/// Reads every entry out of zip bytes, enforcing the per-entry size cap.
///
/// Entries are returned sorted by path.
///
/// # Errors
///
/// Returns [`GaitError::EntryTooLarge`] if a declared or actual entry size
/// exceeds [`MAX_ENTRY_BYTES`], or [`GaitError::Io`] if the archive is
/// malformed.
pub fn read_zip(bytes: &[u8]) -> GaitResult<Vec<ArchiveEntry>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(zip_to_gait_error)?;
    let mut out = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(zip_to_gait_error)?;
        let path = file.name().to_string();
        if file.size() > MAX_ENTRY_BYTES {
            return Err(GaitError::EntryTooLarge {
                path,
                max_bytes: MAX_ENTRY_BYTES,
            });
        }
        let mode = file.unix_mode().unwrap_or(DEFAULT_FILE_MODE);
        let mut data = Vec::new();
        let read = file
            .by_ref()
            .take(MAX_ENTRY_BYTES + 1)
            .read_to_end(&mut data)
            .map_err(GaitError::from)?;
        if read as u64 > MAX_ENTRY_BYTES {
            return Err(GaitError::EntryTooLarge {
                path,
                max_bytes: MAX_ENTRY_BYTES,
            });
        }
        out.push(ArchiveEntry { path, data, mode });
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

/// Reads a foreign (not necessarily deterministic) zip and re-emits it
/// through [`write_deterministic_zip`], so the result is byte-identical to
/// any other normalization of the same logical entry set.
///
/// # Errors
///
/// Same as [`read_zip`] and [`write_deterministic_zip`].
pub fn normalize_zip(bytes: &[u8]) -> GaitResult<Vec<u8>> {
    let entries = read_zip(bytes)?;
    write_deterministic_zip(&entries)
}

fn zip_to_gait_error(err: zip::result::ZipError) -> GaitError {
    GaitError::Io {
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_entries_in_different_order_yield_identical_bytes() {
        let a = vec![
            ArchiveEntry::new("b.json", b"{}".to_vec()),
            ArchiveEntry::new("a.json", b"{}".to_vec()),
        ];
        let b = vec![
            ArchiveEntry::new("a.json", b"{}".to_vec()),
            ArchiveEntry::new("b.json", b"{}".to_vec()),
        ];
        let bytes_a = write_deterministic_zip(&a).unwrap();
        let bytes_b = write_deterministic_zip(&b).unwrap();
        assert_eq!(bytes_a, bytes_b);
    }

    #[test]
    fn building_twice_is_byte_identical() {
        let entries = vec![ArchiveEntry::new("manifest.json", b"{\"a\":1}".to_vec())];
        let first = write_deterministic_zip(&entries).unwrap();
        let second = write_deterministic_zip(&entries).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn round_trips_entry_contents() {
        let entries = vec![
            ArchiveEntry::new("intents.jsonl", b"{\"intent_id\":\"i1\"}\n".to_vec()),
            ArchiveEntry::new("manifest.json", b"{}".to_vec()),
        ];
        let bytes = write_deterministic_zip(&entries).unwrap();
        let read_back = read_zip(&bytes).unwrap();
        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back[0].path, "intents.jsonl");
        assert_eq!(read_back[0].data, b"{\"intent_id\":\"i1\"}\n");
    }

    #[test]
    fn oversized_entry_is_rejected_on_write() {
        let big = vec![0u8; (MAX_ENTRY_BYTES + 1) as usize];
        let entries = vec![ArchiveEntry::new("huge.bin", big)];
        let err = write_deterministic_zip(&entries).unwrap_err();
        assert_eq!(err.category(), gait_error::ErrorCategory::Io);
    }

    #[test]
    fn normalizing_a_deterministic_zip_is_a_no_op() {
        let entries = vec![ArchiveEntry::new("a.json", b"{}".to_vec())];
        let built = write_deterministic_zip(&entries).unwrap();
        let normalized = normalize_zip(&built).unwrap();
        assert_eq!(built, normalized);
    }
}
