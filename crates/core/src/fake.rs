// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake crypto collaborators for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::crypto::{Crypto, CryptoError, SignatureInfo, Signer, VerifyingKey};
use crate::id::{hex_encode, TlfId, UserId};
use crate::metadata::{KeyBundles, MetadataVer, RootMetadata};
use crate::revision::Revision;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn fake_signature(key: &VerifyingKey, msg: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(key.0.as_bytes());
    hasher.update(msg);
    hasher.finalize().to_vec()
}

/// Deterministic signer keyed by a secret string
#[derive(Debug, Clone)]
pub struct FakeSigner {
    key: VerifyingKey,
    signed: Arc<Mutex<usize>>,
}

impl FakeSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: VerifyingKey(hex_encode(&Sha256::digest(secret.as_bytes()))),
            signed: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of signatures produced so far
    pub fn sign_count(&self) -> usize {
        *self.signed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Signer for FakeSigner {
    fn sign(&self, msg: &[u8]) -> Result<SignatureInfo, CryptoError> {
        *self.signed.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(SignatureInfo {
            signature: fake_signature(&self.key, msg),
            verifying_key: self.key.clone(),
        })
    }

    fn verifying_key(&self) -> VerifyingKey {
        self.key.clone()
    }
}

/// Signer that fails once its budget of signatures is spent
pub struct LimitedSigner {
    inner: FakeSigner,
    remaining: AtomicUsize,
}

impl LimitedSigner {
    pub fn new(inner: FakeSigner, limit: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(limit),
        }
    }
}

impl Signer for LimitedSigner {
    fn sign(&self, msg: &[u8]) -> Result<SignatureInfo, CryptoError> {
        let spent = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err();
        if spent {
            return Err(CryptoError::Sign("signature limit reached".to_string()));
        }
        self.inner.sign(msg)
    }

    fn verifying_key(&self) -> VerifyingKey {
        self.inner.verifying_key()
    }
}

/// Verifies signatures made by any [`FakeSigner`]
#[derive(Debug, Clone, Default)]
pub struct FakeCrypto;

impl Crypto for FakeCrypto {
    fn verify(&self, msg: &[u8], sig: &SignatureInfo) -> Result<(), CryptoError> {
        if sig.signature == fake_signature(&sig.verifying_key, msg) {
            Ok(())
        } else {
            Err(CryptoError::BadSignature(sig.verifying_key.clone()))
        }
    }
}

/// Build a merged revision authored by `uid`
pub fn make_md_for_test(
    ver: MetadataVer,
    tlf_id: &TlfId,
    revision: Revision,
    uid: &UserId,
    signer: &dyn Signer,
    prev_root: Option<crate::id::BlobId>,
) -> RootMetadata {
    let mut md = RootMetadata::new(
        ver,
        tlf_id.clone(),
        uid.clone(),
        signer.verifying_key(),
        revision,
    );
    md.set_prev_root(prev_root);
    md.set_serialized_private_metadata(format!("private data {}", revision).into_bytes());
    md
}

/// Key bundles with a single device entry for `uid`
pub fn make_key_bundles_for_test(uid: &UserId) -> KeyBundles {
    let mut bundles = KeyBundles::default();
    bundles
        .writer
        .keys
        .entry(uid.clone())
        .or_default()
        .insert("device".to_string(), b"writer half".to_vec());
    bundles
        .reader
        .keys
        .entry(uid.clone())
        .or_default()
        .insert("device".to_string(), b"reader half".to_vec());
    bundles
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
