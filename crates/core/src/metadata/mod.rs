// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root metadata: one revision of a folder's metadata
//!
//! The journal treats [`RootMetadata`] as an opaque, versioned record with a
//! handful of fields it needs to read or rewrite (revision, prev-root, branch,
//! merge status, usage counters). Each wire version is its own struct; the
//! closed enum dispatches between them.

pub mod key_bundle;
pub mod signed;
pub mod v2;
pub mod v3;

pub use key_bundle::{KeyBundles, ReaderKeyBundleV3, WriterKeyBundleV3};
pub use signed::RootMetadataSigned;
pub use v2::{RootMetadataV2, WriterMetadataV2};
pub use v3::{RootMetadataV3, WriterMetadataV3};

use crate::codec::CodecError;
use crate::crypto::{Crypto, CryptoError, Signer, VerifyingKey};
use crate::id::{BlobId, BranchId, KeyBundleId, TlfId, UserId};
use crate::revision::{MergeStatus, Revision};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Wire version of a metadata blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MetadataVer {
    /// Key material embedded, writer metadata signed internally
    V2 = 2,
    /// Key bundles externalized into side tables
    V3 = 3,
}

impl MetadataVer {
    pub const LATEST: MetadataVer = MetadataVer::V3;
}

impl From<MetadataVer> for u8 {
    fn from(ver: MetadataVer) -> u8 {
        ver as u8
    }
}

impl TryFrom<u8> for MetadataVer {
    type Error = MetadataError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            2 => Ok(MetadataVer::V2),
            3 => Ok(MetadataVer::V3),
            other => Err(MetadataError::UnsupportedVersion(other)),
        }
    }
}

impl fmt::Display for MetadataVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", u8::from(*self))
    }
}

/// Errors from metadata validation
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata at revision {0} is final")]
    IsFinal(Revision),
    #[error("TLF ID mismatch: current {curr}, next {next}")]
    TlfIdMismatch { curr: TlfId, next: TlfId },
    #[error("revision mismatch: current {curr}, next {next}")]
    RevisionMismatch { curr: Revision, next: Revision },
    #[error("prev root mismatch at revision {revision}: expected {expected:?}, got {actual:?}")]
    PrevRootMismatch {
        revision: Revision,
        expected: Option<BlobId>,
        actual: Option<BlobId>,
    },
    #[error("branch ID mismatch: current {curr:?}, next {next:?}")]
    BranchIdMismatch { curr: BranchId, next: BranchId },
    #[error("merged revision {0} cannot follow an unmerged revision")]
    MergedAfterUnmerged(Revision),
    #[error("disk usage mismatch at revision {revision}: expected {expected}, got {actual}")]
    DiskUsageMismatch {
        revision: Revision,
        expected: i128,
        actual: i128,
    },
    #[error("MD disk usage mismatch at revision {revision}: expected {expected}, got {actual}")]
    MdDiskUsageMismatch {
        revision: Revision,
        expected: i128,
        actual: i128,
    },
    #[error("merge status {status} inconsistent with branch {branch_id:?}")]
    StatusBranchMismatch {
        status: MergeStatus,
        branch_id: BranchId,
    },
    #[error("invalid revision {0}")]
    InvalidRevision(Revision),
    #[error("writer {0} is not in the writer list")]
    NotAWriter(UserId),
    #[error("last modified by {actual}, expected {expected}")]
    WrongUser { expected: UserId, actual: UserId },
    #[error("last writer key {actual:?}, expected {expected}")]
    WrongKey {
        expected: VerifyingKey,
        actual: Option<VerifyingKey>,
    },
    #[error("missing writer signature")]
    MissingWriterSignature,
    #[error("writer and reader key bundle IDs must be set together")]
    PartialKeyBundleIds,
    #[error("key bundle IDs set but no key bundles given")]
    MissingKeyBundles,
    #[error("key bundles given but no key bundle IDs set")]
    UnexpectedKeyBundleIds,
    #[error("{0} metadata does not use key bundles")]
    UnexpectedKeyBundles(MetadataVer),
    #[error("key bundle ID mismatch: expected {expected}, got {actual}")]
    KeyBundleIdMismatch {
        expected: KeyBundleId,
        actual: KeyBundleId,
    },
    #[error("unsupported metadata version {0}")]
    UnsupportedVersion(u8),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Per-revision flags outside the writer-only section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFlags {
    pub rekey: bool,
    #[serde(rename = "final")]
    pub is_final: bool,
    pub writer_metadata_copied: bool,
}

/// Writer-only flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterFlags {
    pub unmerged: bool,
}

/// Storage accounting carried by each revision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub disk_usage: u64,
    pub ref_bytes: u64,
    pub unref_bytes: u64,
    pub md_disk_usage: u64,
    pub md_ref_bytes: u64,
}

/// One revision of folder metadata, in any supported wire version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum RootMetadata {
    #[serde(rename = "2")]
    V2(RootMetadataV2),
    #[serde(rename = "3")]
    V3(RootMetadataV3),
}

macro_rules! with_md {
    ($self:expr, $md:ident => $body:expr) => {
        match $self {
            RootMetadata::V2($md) => $body,
            RootMetadata::V3($md) => $body,
        }
    };
}

impl RootMetadata {
    /// A fresh merged revision written by `writer`
    pub fn new(
        ver: MetadataVer,
        tlf_id: TlfId,
        writer: UserId,
        key: VerifyingKey,
        revision: Revision,
    ) -> Self {
        match ver {
            MetadataVer::V2 => RootMetadata::V2(RootMetadataV2::new(tlf_id, writer, revision)),
            MetadataVer::V3 => {
                RootMetadata::V3(RootMetadataV3::new(tlf_id, writer, key, revision))
            }
        }
    }

    pub fn version(&self) -> MetadataVer {
        match self {
            RootMetadata::V2(_) => MetadataVer::V2,
            RootMetadata::V3(_) => MetadataVer::V3,
        }
    }

    pub fn tlf_id(&self) -> &TlfId {
        with_md!(self, md => &md.writer_metadata.tlf_id)
    }

    pub fn revision(&self) -> Revision {
        with_md!(self, md => md.revision)
    }

    pub fn prev_root(&self) -> Option<BlobId> {
        with_md!(self, md => md.prev_root)
    }

    pub fn branch_id(&self) -> BranchId {
        with_md!(self, md => md.writer_metadata.branch_id)
    }

    pub fn merge_status(&self) -> MergeStatus {
        if with_md!(self, md => md.writer_metadata.flags.unmerged) {
            MergeStatus::Unmerged
        } else {
            MergeStatus::Merged
        }
    }

    pub fn is_final(&self) -> bool {
        with_md!(self, md => md.flags.is_final)
    }

    pub fn is_writer_metadata_copied(&self) -> bool {
        with_md!(self, md => md.flags.writer_metadata_copied)
    }

    pub fn usage(&self) -> UsageCounters {
        with_md!(self, md => md.writer_metadata.usage)
    }

    pub fn last_modifying_writer(&self) -> &UserId {
        with_md!(self, md => &md.writer_metadata.last_modifying_writer)
    }

    pub fn last_modifying_user(&self) -> &UserId {
        with_md!(self, md => &md.last_modifying_user)
    }

    pub fn writers(&self) -> &[UserId] {
        with_md!(self, md => &md.writer_metadata.writers)
    }

    pub fn serialized_private_metadata(&self) -> &[u8] {
        with_md!(self, md => &md.writer_metadata.serialized_private_metadata)
    }

    /// IDs of the externalized key bundles, if this version uses them
    pub fn key_bundle_ids(&self) -> Result<Option<(KeyBundleId, KeyBundleId)>, MetadataError> {
        match self {
            RootMetadata::V2(_) => Ok(None),
            RootMetadata::V3(md) => md.key_bundle_ids(),
        }
    }

    pub fn set_revision(&mut self, revision: Revision) {
        with_md!(self, md => md.revision = revision)
    }

    pub fn set_prev_root(&mut self, prev_root: Option<BlobId>) {
        with_md!(self, md => md.prev_root = prev_root)
    }

    pub fn set_branch_id(&mut self, bid: BranchId) {
        with_md!(self, md => md.writer_metadata.branch_id = bid)
    }

    pub fn set_unmerged(&mut self) {
        with_md!(self, md => md.writer_metadata.flags.unmerged = true)
    }

    pub fn set_merged(&mut self) {
        with_md!(self, md => md.writer_metadata.flags.unmerged = false)
    }

    pub fn set_final(&mut self) {
        with_md!(self, md => md.flags.is_final = true)
    }

    pub fn set_writer_metadata_copied(&mut self) {
        with_md!(self, md => md.flags.writer_metadata_copied = true)
    }

    pub fn set_usage(&mut self, usage: UsageCounters) {
        with_md!(self, md => md.writer_metadata.usage = usage)
    }

    pub fn set_serialized_private_metadata(&mut self, data: Vec<u8>) {
        with_md!(self, md => md.writer_metadata.serialized_private_metadata = data)
    }

    /// Point a V3 blob at `bundles`; V2 blobs embed their keys instead
    pub fn attach_key_bundles<C: Crypto>(
        &mut self,
        crypto: &C,
        bundles: &KeyBundles,
    ) -> Result<(), MetadataError> {
        match self {
            RootMetadata::V2(_) => Err(MetadataError::UnexpectedKeyBundles(MetadataVer::V2)),
            RootMetadata::V3(md) => {
                let (wkb, rkb) = bundles.ids(crypto)?;
                md.writer_metadata.writer_key_bundle_id = Some(wkb);
                md.reader_key_bundle_id = Some(rkb);
                Ok(())
            }
        }
    }

    /// Sign the writer-only section in place (no-op for V3)
    pub fn sign_writer_metadata_internally(
        &mut self,
        signer: &dyn Signer,
    ) -> Result<(), CryptoError> {
        match self {
            RootMetadata::V2(md) => md.sign_writer_metadata_internally(signer),
            RootMetadata::V3(_) => Ok(()),
        }
    }

    /// Structural checks plus version-specific signature/bundle checks
    pub fn is_valid_and_signed<C: Crypto>(
        &self,
        crypto: &C,
        extra: Option<&KeyBundles>,
    ) -> Result<(), MetadataError> {
        let revision = self.revision();
        if !revision.is_valid() {
            return Err(MetadataError::InvalidRevision(revision));
        }
        let status = self.merge_status();
        let branch_id = self.branch_id();
        if (status == MergeStatus::Unmerged) == branch_id.is_null() {
            return Err(MetadataError::StatusBranchMismatch { status, branch_id });
        }
        let writer = self.last_modifying_writer();
        if !self.writers().contains(writer) {
            return Err(MetadataError::NotAWriter(writer.clone()));
        }
        match self {
            RootMetadata::V2(md) => md.is_valid_and_signed(crypto, extra),
            RootMetadata::V3(md) => md.is_valid_and_signed(crypto, extra),
        }
    }

    /// Check that `uid` holding `key` made this revision
    pub fn is_last_modified_by(&self, uid: &UserId, key: &VerifyingKey) -> Result<(), MetadataError> {
        if !self.is_writer_metadata_copied() && self.last_modifying_writer() != uid {
            return Err(MetadataError::WrongUser {
                expected: uid.clone(),
                actual: self.last_modifying_writer().clone(),
            });
        }
        if self.last_modifying_user() != uid {
            return Err(MetadataError::WrongUser {
                expected: uid.clone(),
                actual: self.last_modifying_user().clone(),
            });
        }
        let actual = match self {
            RootMetadata::V2(md) => md.writer_verifying_key().cloned(),
            RootMetadata::V3(md) => Some(md.writer_metadata.last_writer_verifying_key.clone()),
        };
        if !self.is_writer_metadata_copied() && actual.as_ref() != Some(key) {
            return Err(MetadataError::WrongKey {
                expected: key.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Check that `next` may directly follow this revision, whose ID is `curr_id`
    pub fn check_valid_successor(
        &self,
        curr_id: BlobId,
        next: &RootMetadata,
    ) -> Result<(), MetadataError> {
        if self.is_final() {
            return Err(MetadataError::IsFinal(self.revision()));
        }
        if self.tlf_id() != next.tlf_id() {
            return Err(MetadataError::TlfIdMismatch {
                curr: self.tlf_id().clone(),
                next: next.tlf_id().clone(),
            });
        }
        if self.revision().next() != Some(next.revision()) {
            return Err(MetadataError::RevisionMismatch {
                curr: self.revision(),
                next: next.revision(),
            });
        }

        // A final revision repeats its predecessor's link.
        let expected_prev_root = if next.is_final() {
            self.prev_root()
        } else {
            Some(curr_id)
        };
        if next.prev_root() != expected_prev_root {
            return Err(MetadataError::PrevRootMismatch {
                revision: next.revision(),
                expected: expected_prev_root,
                actual: next.prev_root(),
            });
        }

        if self.merge_status() == MergeStatus::Unmerged {
            if next.merge_status() == MergeStatus::Merged {
                return Err(MetadataError::MergedAfterUnmerged(next.revision()));
            }
            if self.branch_id() != next.branch_id() {
                return Err(MetadataError::BranchIdMismatch {
                    curr: self.branch_id(),
                    next: next.branch_id(),
                });
            }
        }

        let curr_usage = self.usage();
        let next_usage = next.usage();
        let copied = next.is_writer_metadata_copied();

        let mut expected = i128::from(curr_usage.disk_usage);
        if !copied {
            expected += i128::from(next_usage.ref_bytes) - i128::from(next_usage.unref_bytes);
        }
        let actual = i128::from(next_usage.disk_usage);
        if actual != expected {
            return Err(MetadataError::DiskUsageMismatch {
                revision: next.revision(),
                expected,
                actual,
            });
        }

        let mut expected_md = i128::from(curr_usage.md_disk_usage);
        if !copied {
            expected_md += i128::from(next_usage.md_ref_bytes);
        }
        let actual_md = i128::from(next_usage.md_disk_usage);
        // Older writers copied md_ref_bytes forward unchanged.
        if actual_md != expected_md && curr_usage.md_ref_bytes != next_usage.md_ref_bytes {
            return Err(MetadataError::MdDiskUsageMismatch {
                revision: next.revision(),
                expected: expected_md,
                actual: actual_md,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
