// crates/chronicle-core/src/core/hashing.rs
// ============================================================================
// Module: Chronicle Canonical Hashing
// Description: Canonical JSON encoding and SHA-256 digests for envelopes.
// Purpose: Provide the single canonicalization routine feeding hashing and registries.
// Dependencies: serde_json, sha2, thiserror
// ============================================================================

//! ## Overview
//! One canonicalization routine serves both registry normalization and
//! envelope hashing: object keys are sorted lexicographically by code point,
//! no whitespace is emitted, string escapes follow the standard JSON escape
//! set, and numbers are preserved verbatim from input. Two semantically
//! equivalent payloads therefore hash identically, and a stored payload
//! re-hashes to the stored digest byte for byte.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default hash algorithm for Chronicle envelopes.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Algorithm and Digest
// ============================================================================

/// Supported hash algorithms.
///
/// # Invariants
/// - Variants are stable for serialization and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// Returns a stable label for the algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

/// Hash digest with lowercase hex encoding.
///
/// # Invariants
/// - `value` is lowercase hexadecimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct HashDigest {
    /// Algorithm that produced the digest.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest value.
    pub value: String,
}

impl HashDigest {
    /// Creates a digest from raw hash output bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        let mut value = String::with_capacity(bytes.len() * 2);
        for byte in bytes {
            value.push_str(&format!("{byte:02x}"));
        }
        Self {
            algorithm,
            value,
        }
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canonicalization and hashing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum HashError {
    /// Input was not valid JSON.
    #[error("canonicalization failure: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Canonical JSON
// ============================================================================

/// Encodes a JSON value into canonical bytes.
///
/// Object keys are sorted lexicographically by code point, arrays keep their
/// order, no whitespace is emitted, and numbers are written verbatim as they
/// appeared in the input.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when a string fails to encode.
pub fn canonical_json_bytes(value: &Value) -> Result<Vec<u8>, HashError> {
    let mut out = Vec::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

/// Parses raw JSON text and returns its canonical encoding as a string.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the input is not valid JSON.
pub fn canonicalize_json_text(input: &str) -> Result<String, HashError> {
    let value: Value = serde_json::from_str(input)
        .map_err(|err| HashError::Canonicalization(err.to_string()))?;
    let bytes = canonical_json_bytes(&value)?;
    String::from_utf8(bytes).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Writes the canonical encoding of a value into the output buffer.
fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), HashError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        // Numbers round-trip verbatim under serde_json arbitrary precision.
        Value::Number(number) => out.extend_from_slice(number.to_string().as_bytes()),
        Value::String(string) => write_escaped(string, out)?,
        Value::Array(items) => {
            out.push(b'[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push(b'{');
            for (index, key) in keys.iter().enumerate() {
                if index > 0 {
                    out.push(b',');
                }
                write_escaped(key, out)?;
                out.push(b':');
                if let Some(entry) = map.get(key.as_str()) {
                    write_canonical(entry, out)?;
                }
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// Writes a JSON string literal with the standard escape set.
fn write_escaped(value: &str, out: &mut Vec<u8>) -> Result<(), HashError> {
    let encoded = serde_json::to_string(value)
        .map_err(|err| HashError::Canonicalization(err.to_string()))?;
    out.extend_from_slice(encoded.as_bytes());
    Ok(())
}

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Hashes raw bytes with the requested algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            HashDigest::new(algorithm, &hasher.finalize())
        }
    }
}

/// Hashes the canonical encoding of a JSON value.
///
/// # Errors
///
/// Returns [`HashError`] when canonicalization fails.
pub fn hash_canonical_json(algorithm: HashAlgorithm, value: &Value) -> Result<HashDigest, HashError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
