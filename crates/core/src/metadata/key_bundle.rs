// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Externalized per-device key bundles (V3 metadata only)

use super::MetadataError;
use crate::crypto::Crypto;
use crate::id::{KeyBundleId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Encrypted key halves for every device of one user, keyed by device key
pub type DeviceKeys = BTreeMap<String, Vec<u8>>;

/// Key material for folder writers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterKeyBundleV3 {
    pub keys: BTreeMap<UserId, DeviceKeys>,
}

/// Key material for folder readers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderKeyBundleV3 {
    pub keys: BTreeMap<UserId, DeviceKeys>,
}

/// The side tables referenced by a V3 metadata blob
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBundles {
    pub writer: WriterKeyBundleV3,
    pub reader: ReaderKeyBundleV3,
}

impl KeyBundles {
    /// Compute the IDs of both bundles
    pub fn ids<C: Crypto>(&self, crypto: &C) -> Result<(KeyBundleId, KeyBundleId), MetadataError> {
        Ok((
            crypto.make_key_bundle_id(&self.writer)?,
            crypto.make_key_bundle_id(&self.reader)?,
        ))
    }
}

/// Verify that `bundles` hash to the given IDs
pub fn check_key_bundles<C: Crypto>(
    crypto: &C,
    wkb_id: KeyBundleId,
    rkb_id: KeyBundleId,
    bundles: &KeyBundles,
) -> Result<(), MetadataError> {
    let (actual_wkb, actual_rkb) = bundles.ids(crypto)?;
    if actual_wkb != wkb_id {
        return Err(MetadataError::KeyBundleIdMismatch {
            expected: wkb_id,
            actual: actual_wkb,
        });
    }
    if actual_rkb != rkb_id {
        return Err(MetadataError::KeyBundleIdMismatch {
            expected: rkb_id,
            actual: actual_rkb,
        });
    }
    Ok(())
}
