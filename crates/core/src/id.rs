// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifiers: content hashes, branch IDs, folder and user IDs

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Hash type byte prepended to every encoded digest (SHA-256)
pub const HASH_TYPE_SHA256: u8 = 0x01;

const DIGEST_LEN: usize = 32;

/// Error parsing a hex-encoded identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdError {
    #[error("expected {expected} hex characters, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("unknown hash type {0:#04x}")]
    HashType(u8),
    #[error("invalid hex character in {0:?}")]
    Hex(String),
}

/// A typed SHA-256 digest, rendered as `01` followed by the hex digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashDigest([u8; DIGEST_LEN]);

impl HashDigest {
    /// Hash the given bytes
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{}", HASH_TYPE_SHA256, hex_encode(&self.0))
    }
}

impl fmt::Debug for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashDigest({})", self)
    }
}

impl FromStr for HashDigest {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expected = 2 + 2 * DIGEST_LEN;
        if s.len() != expected {
            return Err(ParseIdError::Length {
                expected,
                actual: s.len(),
            });
        }
        let bytes = hex_decode(s)?;
        if bytes[0] != HASH_TYPE_SHA256 {
            return Err(ParseIdError::HashType(bytes[0]));
        }
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&bytes[1..]);
        Ok(Self(digest))
    }
}

impl Serialize for HashDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HashDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Content hash of an encoded metadata blob
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(pub HashDigest);

impl BlobId {
    /// Compute the ID of already-encoded blob bytes
    pub fn from_encoded(bytes: &[u8]) -> Self {
        Self(HashDigest::of(bytes))
    }

    /// A recognizable ID for tests, distinct for each `n`
    pub fn fake(n: u8) -> Self {
        let mut bytes = [0u8; DIGEST_LEN];
        bytes[0] = n;
        Self(HashDigest::from_bytes(bytes))
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self.0)
    }
}

impl FromStr for BlobId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Content hash of an encoded key bundle
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBundleId(pub HashDigest);

impl KeyBundleId {
    pub fn from_encoded(bytes: &[u8]) -> Self {
        Self(HashDigest::of(bytes))
    }
}

impl fmt::Display for KeyBundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for KeyBundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyBundleId({})", self.0)
    }
}

/// Identifies a fork of revision history
///
/// The nil UUID is the merged (master) branch; the all-ones UUID marks a
/// local squash that is still being assembled. Every other value names an
/// unmerged conflict branch.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(Uuid);

impl BranchId {
    pub const NULL: BranchId = BranchId(Uuid::nil());
    pub const PENDING_LOCAL_SQUASH: BranchId = BranchId(Uuid::from_u128(u128::MAX));

    /// A fresh random branch ID
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// A recognizable branch ID for tests
    pub fn fake(n: u8) -> Self {
        Self(Uuid::from_u128(u128::from(n) + 1))
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    pub fn is_pending_local_squash(&self) -> bool {
        *self == Self::PENDING_LOCAL_SQUASH
    }
}

impl Default for BranchId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl fmt::Debug for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "BranchId(null)")
        } else if self.is_pending_local_squash() {
            write!(f, "BranchId(pending-local-squash)")
        } else {
            write!(f, "BranchId({})", self.0.simple())
        }
    }
}

/// Unique identifier for a top-level folder
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TlfId(pub String);

impl fmt::Display for TlfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TlfId {
    fn from(s: &str) -> Self {
        TlfId(s.to_string())
    }
}

/// Unique identifier for a user
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// Hex encoding helper
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>, ParseIdError> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return Err(ParseIdError::Hex(s.to_string()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ParseIdError::Hex(s.to_string())))
        .collect()
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
