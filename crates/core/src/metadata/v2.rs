// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Version 2 metadata: key material embedded, writer metadata signed internally

use super::key_bundle::{DeviceKeys, KeyBundles};
use super::{MetadataError, MetadataFlags, MetadataVer, UsageCounters, WriterFlags};
use crate::codec;
use crate::crypto::{Crypto, CryptoError, SignatureInfo, Signer, VerifyingKey};
use crate::id::{BlobId, BranchId, TlfId, UserId};
use crate::revision::Revision;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The part of a V2 revision only writers may change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterMetadataV2 {
    pub tlf_id: TlfId,
    pub writers: Vec<UserId>,
    pub last_modifying_writer: UserId,
    pub serialized_private_metadata: Vec<u8>,
    pub branch_id: BranchId,
    pub flags: WriterFlags,
    pub usage: UsageCounters,
    pub writer_keys: BTreeMap<UserId, DeviceKeys>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootMetadataV2 {
    pub writer_metadata: WriterMetadataV2,
    pub writer_signature: Option<SignatureInfo>,
    pub last_modifying_user: UserId,
    pub flags: MetadataFlags,
    pub revision: Revision,
    pub prev_root: Option<BlobId>,
    pub reader_keys: BTreeMap<UserId, DeviceKeys>,
}

impl RootMetadataV2 {
    pub fn new(tlf_id: TlfId, writer: UserId, revision: Revision) -> Self {
        Self {
            writer_metadata: WriterMetadataV2 {
                tlf_id,
                writers: vec![writer.clone()],
                last_modifying_writer: writer.clone(),
                serialized_private_metadata: Vec::new(),
                branch_id: BranchId::NULL,
                flags: WriterFlags::default(),
                usage: UsageCounters::default(),
                writer_keys: BTreeMap::new(),
            },
            writer_signature: None,
            last_modifying_user: writer,
            flags: MetadataFlags::default(),
            revision,
            prev_root: None,
            reader_keys: BTreeMap::new(),
        }
    }

    pub(super) fn sign_writer_metadata_internally(
        &mut self,
        signer: &dyn Signer,
    ) -> Result<(), CryptoError> {
        let buf = codec::encode(&self.writer_metadata)?;
        self.writer_signature = Some(signer.sign(&buf)?);
        Ok(())
    }

    pub(super) fn is_valid_and_signed<C: Crypto>(
        &self,
        crypto: &C,
        extra: Option<&KeyBundles>,
    ) -> Result<(), MetadataError> {
        if extra.is_some() {
            return Err(MetadataError::UnexpectedKeyBundles(MetadataVer::V2));
        }
        let sig = self
            .writer_signature
            .as_ref()
            .ok_or(MetadataError::MissingWriterSignature)?;
        let buf = codec::encode(&self.writer_metadata)?;
        crypto.verify(&buf, sig)?;
        Ok(())
    }

    pub(super) fn writer_verifying_key(&self) -> Option<&VerifyingKey> {
        self.writer_signature.as_ref().map(|sig| &sig.verifying_key)
    }
}
