// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal errors

use mdj_core::{BranchId, CodecError, CryptoError, MetadataError, UserId};
use mdj_storage::StorageError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    /// A merged revision was put while the journal is on a branch
    #[error("merged put while journal is on branch {0}; resubmit as unmerged")]
    Conflict(BranchId),
    #[error("invalid successor: {0}")]
    InvalidSuccessor(#[source] MetadataError),
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("integrity error: {0}")]
    Integrity(String),
    #[error("inconsistent journal state: {0}")]
    InconsistentState(String),
    #[error("branch ID mismatch: expected {expected:?}, got {actual:?}")]
    BranchMismatch { expected: BranchId, actual: BranchId },
    #[error("user {0} is not a writer of this folder")]
    Unauthorized(UserId),
    #[error("journal at {} is locked by another process", path.display())]
    Locked {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("journal is shut down")]
    ShutDown,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl JournalError {
    /// Whether this error means "nothing there" (e.g. an empty journal)
    pub fn is_not_found(&self) -> bool {
        matches!(self, JournalError::Storage(e) if e.is_not_found())
    }

    /// Whether the caller should retry the put as unmerged
    pub fn is_conflict(&self) -> bool {
        matches!(self, JournalError::Conflict(_))
    }
}
