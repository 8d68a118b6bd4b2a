// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version 3 metadata: key bundles externalized into side tables
//!
//! V3 writer metadata carries no internal signature; authenticity comes from
//! the root signature applied when a revision is sent to the server.

use super::key_bundle::{check_key_bundles, KeyBundles};
use super::{MetadataError, MetadataFlags, UsageCounters, WriterFlags};
use crate::crypto::{Crypto, VerifyingKey};
use crate::id::{BlobId, BranchId, KeyBundleId, TlfId, UserId};
use crate::revision::Revision;
use serde::{Deserialize, Serialize};

/// The part of a V3 revision only writers may change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterMetadataV3 {
    pub tlf_id: TlfId,
    pub writers: Vec<UserId>,
    pub last_modifying_writer: UserId,
    pub last_writer_verifying_key: VerifyingKey,
    pub serialized_private_metadata: Vec<u8>,
    pub branch_id: BranchId,
    pub flags: WriterFlags,
    pub usage: UsageCounters,
    pub writer_key_bundle_id: Option<KeyBundleId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootMetadataV3 {
    pub writer_metadata: WriterMetadataV3,
    pub last_modifying_user: UserId,
    pub flags: MetadataFlags,
    pub revision: Revision,
    pub prev_root: Option<BlobId>,
    pub reader_key_bundle_id: Option<KeyBundleId>,
}

impl RootMetadataV3 {
    pub fn new(tlf_id: TlfId, writer: UserId, key: VerifyingKey, revision: Revision) -> Self {
        Self {
            writer_metadata: WriterMetadataV3 {
                tlf_id,
                writers: vec![writer.clone()],
                last_modifying_writer: writer.clone(),
                last_writer_verifying_key: key,
                serialized_private_metadata: Vec::new(),
                branch_id: BranchId::NULL,
                flags: WriterFlags::default(),
                usage: UsageCounters::default(),
                writer_key_bundle_id: None,
            },
            last_modifying_user: writer,
            flags: MetadataFlags::default(),
            revision,
            prev_root: None,
            reader_key_bundle_id: None,
        }
    }

    pub fn key_bundle_ids(&self) -> Result<Option<(KeyBundleId, KeyBundleId)>, MetadataError> {
        match (self.writer_metadata.writer_key_bundle_id, self.reader_key_bundle_id) {
            (Some(wkb), Some(rkb)) => Ok(Some((wkb, rkb))),
            (None, None) => Ok(None),
            _ => Err(MetadataError::PartialKeyBundleIds),
        }
    }

    pub(super) fn is_valid_and_signed<C: Crypto>(
        &self,
        crypto: &C,
        extra: Option<&KeyBundles>,
    ) -> Result<(), MetadataError> {
        match (self.key_bundle_ids()?, extra) {
            (Some((wkb, rkb)), Some(bundles)) => check_key_bundles(crypto, wkb, rkb, bundles),
            (Some(_), None) => Err(MetadataError::MissingKeyBundles),
            (None, Some(_)) => Err(MetadataError::UnexpectedKeyBundleIds),
            (None, None) => Ok(()),
        }
    }
}
