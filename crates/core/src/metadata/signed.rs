// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root-signed metadata, the form sent to the metadata server

use super::RootMetadata;
use crate::codec;
use crate::crypto::{Crypto, CryptoError, SignatureInfo, Signer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootMetadataSigned {
    pub md: RootMetadata,
    pub signature_info: SignatureInfo,
    /// When the revision was stored locally
    pub local_timestamp: DateTime<Utc>,
}

impl RootMetadataSigned {
    pub fn sign(
        md: RootMetadata,
        signer: &dyn Signer,
        local_timestamp: DateTime<Utc>,
    ) -> Result<Self, CryptoError> {
        let buf = codec::encode(&md)?;
        let signature_info = signer.sign(&buf)?;
        Ok(Self {
            md,
            signature_info,
            local_timestamp,
        })
    }

    pub fn verify<C: Crypto>(&self, crypto: &C) -> Result<(), CryptoError> {
        let buf = codec::encode(&self.md)?;
        crypto.verify(&buf, &self.signature_info)
    }
}
