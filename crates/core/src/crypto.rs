// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crypto collaborator traits
//!
//! The journal hashes, signs and verifies through these traits and never
//! implements the primitives itself.

use crate::codec::{self, CodecError};
use crate::id::{BlobId, BranchId, KeyBundleId};
use crate::metadata::RootMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Public half of a device signing key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerifyingKey(pub String);

impl fmt::Display for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signature along with the key that can verify it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature: Vec<u8>,
    pub verifying_key: VerifyingKey,
}

/// Errors from crypto collaborators
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("signing failed: {0}")]
    Sign(String),
    #[error("bad signature from key {0}")]
    BadSignature(VerifyingKey),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Signs on behalf of the local device
pub trait Signer {
    fn sign(&self, msg: &[u8]) -> Result<SignatureInfo, CryptoError>;

    fn verifying_key(&self) -> VerifyingKey;
}

/// Pure crypto operations: hashing, verification, random IDs
pub trait Crypto: Clone {
    /// Verify `sig` over `msg`
    fn verify(&self, msg: &[u8], sig: &SignatureInfo) -> Result<(), CryptoError>;

    /// Content hash of a metadata blob
    fn make_blob_id(&self, md: &RootMetadata) -> Result<BlobId, CryptoError> {
        Ok(BlobId::from_encoded(&codec::encode(md)?))
    }

    /// Content hash of a key bundle
    fn make_key_bundle_id<T: Serialize>(&self, bundle: &T) -> Result<KeyBundleId, CryptoError> {
        Ok(KeyBundleId::from_encoded(&codec::encode(bundle)?))
    }

    fn make_random_branch_id(&self) -> BranchId {
        BranchId::new_random()
    }
}
