// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage errors

use crate::disk_journal::JournalOrdinal;
use mdj_core::{CryptoError, MetadataVer, Revision};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not found: {kind}/{id}")]
    NotFound { kind: &'static str, id: String },
    #[error("integrity error: {0}")]
    Integrity(String),
    #[error("ordinal {actual} appended out of order, expected {expected}")]
    OutOfOrder {
        expected: JournalOrdinal,
        actual: JournalOrdinal,
    },
    #[error("invalid revision {0}")]
    InvalidRevision(Revision),
    #[error("metadata version {found} is newer than supported {supported}")]
    UnsupportedVersion {
        found: MetadataVer,
        supported: MetadataVer,
    },
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl StorageError {
    /// Whether this error means the requested thing does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound { .. } => true,
            StorageError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
