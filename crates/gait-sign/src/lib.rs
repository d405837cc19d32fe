// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

//! Ed25519 signing over already-canonicalized bytes.
//!
//! This crate never canonicalizes anything itself. [`CanonicalBytes`] is a
//! thin newtype a caller constructs from [`gait_canon`] output; the
//! signing/verification functions only accept that type, so a caller cannot
//! accidentally sign non-canonical bytes by passing a bare `&[u8]`.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use gait_error::{GaitError, GaitResult};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Bytes known to already be in canonical form (produced by `gait-canon`).
#[derive(Debug, Clone, Copy)]
pub struct CanonicalBytes<'a>(&'a [u8]);

impl<'a> CanonicalBytes<'a> {
    /// Wraps `bytes`, asserting they are already canonical.
    ///
    /// Callers are expected to have produced `bytes` via `gait_canon`; this
    /// constructor performs no re-canonicalization.
    #[must_use]
    pub fn assert_canonical(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }

    /// Returns the wrapped bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0
    }
}

/// Generates a fresh Ed25519 keypair using the OS random number generator.
#[must_use]
pub fn generate_keypair() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Stable identifier for a verifying key: the first 16 hex characters of
/// the SHA-256 digest of its compressed bytes.
#[must_use]
pub fn key_id(verifying_key: &VerifyingKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifying_key.as_bytes());
    let digest = hasher.finalize();
    hex_encode(&digest[..8])
}

/// Signs canonical bytes, returning the raw Ed25519 signature.
#[must_use]
pub fn sign_canonical_bytes(signing_key: &SigningKey, bytes: CanonicalBytes<'_>) -> Signature {
    signing_key.sign(bytes.as_bytes())
}

/// Verifies an Ed25519 signature over canonical bytes.
#[must_use]
pub fn verify_canonical_bytes(
    verifying_key: &VerifyingKey,
    bytes: CanonicalBytes<'_>,
    signature: &Signature,
) -> bool {
    verifying_key.verify(bytes.as_bytes(), signature).is_ok()
}

/// Parses a hex-encoded verifying key.
///
/// # Errors
///
/// Returns [`GaitError::InvalidInput`] if `hex` is not 64 hex characters or
/// does not decode to a valid Ed25519 point.
pub fn verifying_key_from_hex(hex: &str) -> GaitResult<VerifyingKey> {
    let bytes = hex_decode(hex).ok_or_else(|| GaitError::InvalidInput {
        message: format!("invalid hex-encoded verifying key: {hex}"),
    })?;
    let array: [u8; 32] = bytes.as_slice().try_into().map_err(|_| GaitError::InvalidInput {
        message: format!("verifying key must be 32 bytes, got {}", bytes.len()),
    })?;
    VerifyingKey::from_bytes(&array).map_err(|e| GaitError::InvalidInput {
        message: format!("invalid ed25519 verifying key: {e}"),
    })
}

/// Hex-encodes a signature for embedding in JSON manifests.
#[must_use]
pub fn signature_to_hex(signature: &Signature) -> String {
    hex_encode(&signature.to_bytes())
}

/// Parses a hex-encoded signature.
///
/// # Errors
///
/// Returns [`GaitError::InvalidInput`] if `hex` does not decode to a valid
/// 64-byte Ed25519 signature.
pub fn signature_from_hex(hex: &str) -> GaitResult<Signature> {
    let bytes = hex_decode(hex).ok_or_else(|| GaitError::InvalidInput {
        message: format!("invalid hex-encoded signature: {hex}"),
    })?;
    let array: [u8; 64] = bytes.as_slice().try_into().map_err(|_| GaitError::InvalidInput {
        message: format!("signature must be 64 bytes, got {}", bytes.len()),
    })?;
    Ok(Signature::from_bytes(&array))
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let hi = (bytes[i] as char).to_digit(16)?;
        let lo = (bytes[i + 1] as char).to_digit(16)?;
        out.push(((hi << 4) | lo) as u8);
        i += 2;
    }
    Some(out)
}
