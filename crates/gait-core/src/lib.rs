// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Shared identifiers, timestamps, and small record shapes used across
//! the runpack, pack, callpack, and session crates.

use chrono::{DateTime, TimeZone, Utc};
use gait_error::{GaitError, GaitResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use gait_error::ErrorCategory;

/// Convenience result alias re-exported for downstream crates.
pub type CoreResult<T> = GaitResult<T>;

/// The fixed timestamp embedded in every built manifest, so build output
/// never depends on wall-clock time.
#[must_use]
pub fn deterministic_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1980, 1, 1, 0, 0, 0).single().expect(
        "1980-01-01T00:00:00Z is an unambiguous UTC instant",
    )
}

macro_rules! string_identifier {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Builds a new identifier, rejecting an empty string.
            ///
            /// # Errors
            ///
            /// Returns [`GaitError::MissingField`] if `value` is empty.
            pub fn new(value: impl Into<String>) -> GaitResult<Self> {
                let value = value.into();
                if value.is_empty() {
                    return Err(GaitError::MissingField {
                        field: stringify!($name).to_ascii_lowercase(),
                    });
                }
                Ok(Self(value))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_identifier!(RunId, "Identifier of a single recorded agent run.");
string_identifier!(SessionId, "Identifier of a long-running agent session.");
string_identifier!(IntentId, "Identifier of one tool-call intent within a run.");
string_identifier!(PackId, "Content-addressed identifier of an outer pack.");

/// Schema identifier embedded in manifests (e.g. `"gait.pack.manifest"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(pub String);

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Schema version embedded in manifests (e.g. `"1.0.0"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(pub String);

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a runpack stores the literal tool payloads (`raw`) or only
/// references to them (`reference`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Only references to external payloads are stored.
    Reference,
    /// Full payload bytes are stored inline.
    Raw,
}

/// Whether a runpack's context evidence is mandatory or best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextEvidenceMode {
    /// Context evidence is recorded when available, but not required.
    BestEffort,
    /// A non-empty `context_set_digest` is mandatory.
    Required,
}

/// One `{path, sha256}` entry in a manifest's file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashEntry {
    /// Archive-relative path.
    pub path: String,
    /// Lowercase hex SHA-256 of the canonical file contents.
    pub sha256: String,
}

/// An Ed25519 signature embedded in a manifest, keyed by a stable key id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSignature {
    /// Stable identifier of the verifying key.
    pub signing_key_id: String,
    /// Hex-encoded Ed25519 signature bytes.
    pub signature: String,
}

/// Outcome of attempting to verify a manifest or proof-record signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    /// No signature was present on the artifact.
    Missing,
    /// Signatures were present but no public key was supplied to verify them.
    Skipped,
    /// At least one signature was present and verified successfully.
    Verified,
    /// At least one signature was present and failed to verify.
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_epoch_is_the_fixed_instant() {
        assert_eq!(deterministic_epoch().to_rfc3339(), "1980-01-01T00:00:00+00:00");
    }

    #[test]
    fn identifiers_reject_empty_strings() {
        assert!(RunId::new("").is_err());
        assert!(RunId::new("run_1").is_ok());
    }

    #[test]
    fn identifiers_display_their_inner_value() {
        let id = IntentId::new("intent_1").unwrap();
        assert_eq!(id.to_string(), "intent_1");
        assert_eq!(id.as_str(), "intent_1");
    }
}
