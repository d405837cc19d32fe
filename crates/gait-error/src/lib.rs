// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Shared error taxonomy for every crate in the workspace.
//!
//! Every error carries one of four categories — `InvalidInput`, `Verification`,
//! `Contention`, `IO` — and a stable code following the pattern `GAIT-E###`.
//! Category boundaries mirror the ones the core is specified against: a
//! `Verification` error always comes with a remediation hint, the others
//! do not.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// The four error categories the core is specified to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed or missing input: bad path, unknown schema, negative count.
    InvalidInput,
    /// Integrity, linkage, cross-file, or signature mismatch.
    Verification,
    /// A lock could not be acquired within its configured timeout.
    Contention,
    /// Filesystem or archive I/O failure.
    Io,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidInput => "invalid_input",
            Self::Verification => "verification",
            Self::Contention => "contention",
            Self::Io => "io",
        };
        write!(f, "{s}")
    }
}

/// Every error the core can produce.
#[derive(Debug, thiserror::Error)]
pub enum GaitError {
    /// A required field was missing or empty.
    #[error("[{code}] missing required field: {field}", code = Self::MISSING_FIELD_CODE)]
    MissingField {
        /// Dot-separated path of the missing field.
        field: String,
    },

    /// A schema id or version was not recognized.
    #[error("[{code}] unknown schema {schema_id} version {schema_version}", code = Self::UNKNOWN_SCHEMA_CODE)]
    UnknownSchema {
        /// The unrecognized schema id.
        schema_id: String,
        /// The unrecognized schema version.
        schema_version: String,
    },

    /// A path supplied by the caller was malformed or escaped its root.
    #[error("[{code}] malformed path: {path}", code = Self::MALFORMED_PATH_CODE)]
    MalformedPath {
        /// The offending path, as given.
        path: String,
    },

    /// A count or index that must be non-negative was negative.
    #[error("[{code}] invalid count for {field}: {value}", code = Self::INVALID_COUNT_CODE)]
    InvalidCount {
        /// Name of the field carrying the bad count.
        field: String,
        /// The offending value.
        value: i64,
    },

    /// A generic input validation failure carrying a caller-supplied message.
    #[error("[{code}] {message}", code = Self::INVALID_INPUT_CODE)]
    InvalidInput {
        /// Human-readable explanation.
        message: String,
    },

    /// A structural or cryptographic verification failure.
    #[error("[{code}] {message} (hint: {hint})", code = Self::VERIFICATION_FAILED_CODE)]
    VerificationFailed {
        /// Human-readable explanation of what failed.
        message: String,
        /// Remediation hint shown to the operator.
        hint: String,
    },

    /// A lock could not be acquired before its timeout elapsed.
    #[error(
        "[{code}] lock contention on {lock_path} after {attempts} attempts ({waited_ms}ms waited, timeout {timeout_ms}ms)",
        code = Self::LOCK_CONTENTION_CODE
    )]
    LockContention {
        /// Path of the lock file being contended.
        lock_path: PathBuf,
        /// Total time waited, in milliseconds.
        waited_ms: u64,
        /// Number of acquisition attempts made.
        attempts: u32,
        /// The configured timeout, in milliseconds.
        timeout_ms: u64,
        /// The configured retry interval, in milliseconds.
        retry_ms: u64,
        /// The lock profile in effect (`standard` or `swarm`).
        profile: String,
    },

    /// An underlying filesystem or archive I/O operation failed.
    #[error("[{code}] io error: {source}", code = Self::IO_CODE)]
    Io {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A zip archive entry exceeded the maximum permitted size.
    #[error("[{code}] entry {path} exceeds maximum size of {max_bytes} bytes", code = Self::ENTRY_TOO_LARGE_CODE)]
    EntryTooLarge {
        /// Path of the offending entry within the archive.
        path: String,
        /// The configured maximum, in bytes.
        max_bytes: u64,
    },
}

impl GaitError {
    /// Stable code for [`GaitError::MissingField`].
    pub const MISSING_FIELD_CODE: &'static str = "GAIT-E001";
    /// Stable code for [`GaitError::UnknownSchema`].
    pub const UNKNOWN_SCHEMA_CODE: &'static str = "GAIT-E002";
    /// Stable code for [`GaitError::MalformedPath`].
    pub const MALFORMED_PATH_CODE: &'static str = "GAIT-E003";
    /// Stable code for [`GaitError::InvalidCount`].
    pub const INVALID_COUNT_CODE: &'static str = "GAIT-E004";
    /// Stable code for [`GaitError::InvalidInput`].
    pub const INVALID_INPUT_CODE: &'static str = "GAIT-E005";
    /// Stable code for [`GaitError::VerificationFailed`].
    pub const VERIFICATION_FAILED_CODE: &'static str = "GAIT-E006";
    /// Stable code for [`GaitError::LockContention`].
    pub const LOCK_CONTENTION_CODE: &'static str = "GAIT-E007";
    /// Stable code for [`GaitError::Io`].
    pub const IO_CODE: &'static str = "GAIT-E008";
    /// Stable code for [`GaitError::EntryTooLarge`].
    pub const ENTRY_TOO_LARGE_CODE: &'static str = "GAIT-E009";

    /// Returns this error's stable code string.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => Self::MISSING_FIELD_CODE,
            Self::UnknownSchema { .. } => Self::UNKNOWN_SCHEMA_CODE,
            Self::MalformedPath { .. } => Self::MALFORMED_PATH_CODE,
            Self::InvalidCount { .. } => Self::INVALID_COUNT_CODE,
            Self::InvalidInput { .. } => Self::INVALID_INPUT_CODE,
            Self::VerificationFailed { .. } => Self::VERIFICATION_FAILED_CODE,
            Self::LockContention { .. } => Self::LOCK_CONTENTION_CODE,
            Self::Io { .. } => Self::IO_CODE,
            Self::EntryTooLarge { .. } => Self::ENTRY_TOO_LARGE_CODE,
        }
    }

    /// Returns this error's category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingField { .. }
            | Self::UnknownSchema { .. }
            | Self::MalformedPath { .. }
            | Self::InvalidCount { .. }
            | Self::InvalidInput { .. } => ErrorCategory::InvalidInput,
            Self::VerificationFailed { .. } => ErrorCategory::Verification,
            Self::LockContention { .. } => ErrorCategory::Contention,
            Self::Io { .. } | Self::EntryTooLarge { .. } => ErrorCategory::Io,
        }
    }

    /// Returns the remediation hint for `Verification` errors, if any.
    #[must_use]
    pub fn remediation_hint(&self) -> Option<&str> {
        match self {
            Self::VerificationFailed { hint, .. } => Some(hint.as_str()),
            _ => None,
        }
    }

    /// Convenience constructor for a verification failure with the
    /// workspace's standard remediation hint.
    #[must_use]
    pub fn verification(message: impl Into<String>) -> Self {
        Self::VerificationFailed {
            message: message.into(),
            hint: "re-run verify after checking artifact integrity".to_string(),
        }
    }
}

impl From<io::Error> for GaitError {
    fn from(source: io::Error) -> Self {
        Self::Io { source }
    }
}

/// Convenience result alias used throughout the workspace.
pub type GaitResult<T> = Result<T, GaitError>;

/// Static description/catalog lookup over every [`GaitError`] code.
pub struct ErrorCatalog;

/// All stable codes currently defined, in declaration order.
const ALL_CODES: &[&str] = &[
    GaitError::MISSING_FIELD_CODE,
    GaitError::UNKNOWN_SCHEMA_CODE,
    GaitError::MALFORMED_PATH_CODE,
    GaitError::INVALID_COUNT_CODE,
    GaitError::INVALID_INPUT_CODE,
    GaitError::VERIFICATION_FAILED_CODE,
    GaitError::LOCK_CONTENTION_CODE,
    GaitError::IO_CODE,
    GaitError::ENTRY_TOO_LARGE_CODE,
];

impl ErrorCatalog {
    /// Returns every stable error code defined by this crate.
    #[must_use]
    pub fn all() -> &'static [&'static str] {
        ALL_CODES
    }

    /// Returns `true` if `code` is a recognized stable error code.
    #[must_use]
    pub fn contains(code: &str) -> bool {
        ALL_CODES.contains(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_codes_are_unique() {
        let mut codes = ALL_CODES.to_vec();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ALL_CODES.len());
    }

    #[test]
    fn verification_errors_carry_a_hint() {
        let err = GaitError::verification("hash mismatch at path foo.json");
        assert_eq!(err.category(), ErrorCategory::Verification);
        assert!(err.remediation_hint().is_some());
    }

    #[test]
    fn lock_contention_is_contention_category() {
        let err = GaitError::LockContention {
            lock_path: PathBuf::from("/tmp/session.lock"),
            waited_ms: 2000,
            attempts: 10,
            timeout_ms: 2000,
            retry_ms: 50,
            profile: "standard".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Contention);
        assert_eq!(err.code(), GaitError::LOCK_CONTENTION_CODE);
    }

    #[test]
    fn io_error_converts_from_std_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing file");
        let err: GaitError = io_err.into();
        assert_eq!(err.category(), ErrorCategory::Io);
    }
}
