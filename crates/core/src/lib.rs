// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! mdj-core: metadata types shared by the journal crates
//!
//! This crate provides:
//! - Content-hash, branch and folder identifiers
//! - Versioned root metadata and its successor rules
//! - Codec and crypto collaborator seams
//! - A clock abstraction for local timestamps

pub mod clock;
pub mod codec;
pub mod crypto;
pub mod id;
pub mod metadata;
pub mod revision;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use clock::{Clock, FakeClock, SystemClock};
pub use codec::CodecError;
pub use crypto::{Crypto, CryptoError, SignatureInfo, Signer, VerifyingKey};
pub use id::{hex_encode, BlobId, BranchId, HashDigest, KeyBundleId, ParseIdError, TlfId, UserId};
pub use metadata::{
    KeyBundles, MetadataError, MetadataFlags, MetadataVer, RootMetadata, RootMetadataSigned,
    UsageCounters,
};
pub use revision::{MergeStatus, Revision};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeCrypto, FakeSigner, LimitedSigner};
