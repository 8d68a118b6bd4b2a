// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote metadata server seam
//!
//! The journal flushes one signed revision at a time through [`MdServer`].
//! The wire protocol lives behind this trait.

use mdj_core::{BranchId, KeyBundles, MergeStatus, Revision, RootMetadataSigned, TlfId};
use thiserror::Error;

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMdServer, ServerCall};

/// Errors returned by the metadata server
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// The server already holds a different revision at this number
    #[error("conflicting revision: server expected {expected}, got {actual}")]
    ConflictRevision { expected: Revision, actual: Revision },
    #[error("conflicting prev root at revision {0}")]
    ConflictPrevRoot(Revision),
    #[error("conflicting disk usage at revision {0}")]
    ConflictDiskUsage(Revision),
    #[error("server rejected revision {revision}: {reason}")]
    Rejected { revision: Revision, reason: String },
    #[error("server unavailable: {0}")]
    Unavailable(String),
}

impl ServerError {
    /// The only rejection a flush recovers from by branching
    pub fn is_revision_conflict(&self) -> bool {
        matches!(self, ServerError::ConflictRevision { .. })
    }
}

/// The remote authority for folder metadata
pub trait MdServer {
    /// Durably store one signed revision
    fn put(&self, rmds: &RootMetadataSigned, extra: Option<&KeyBundles>) -> Result<(), ServerError>;

    /// The revision the server holds at `revision` on the given branch, if any
    fn get_for_revision(
        &self,
        tlf: &TlfId,
        bid: BranchId,
        status: MergeStatus,
        revision: Revision,
    ) -> Result<Option<RootMetadataSigned>, ServerError>;
}

impl<S: MdServer + ?Sized> MdServer for &S {
    fn put(&self, rmds: &RootMetadataSigned, extra: Option<&KeyBundles>) -> Result<(), ServerError> {
        (**self).put(rmds, extra)
    }

    fn get_for_revision(
        &self,
        tlf: &TlfId,
        bid: BranchId,
        status: MergeStatus,
        revision: Revision,
    ) -> Result<Option<RootMetadataSigned>, ServerError> {
        (**self).get_for_revision(tlf, bid, status, revision)
    }
}
