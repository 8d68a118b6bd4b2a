// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory metadata server for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{MdServer, ServerError};
use mdj_core::{
    BlobId, BranchId, Crypto, FakeCrypto, KeyBundles, MergeStatus, MetadataError, Revision,
    RootMetadataSigned, TlfId,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Recorded call to the fake server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCall {
    Put {
        revision: Revision,
        branch_id: BranchId,
        with_bundles: bool,
    },
    GetForRevision {
        branch_id: BranchId,
        revision: Revision,
    },
}

#[derive(Default)]
struct FakeServerState {
    histories: BTreeMap<(TlfId, BranchId), Vec<(BlobId, RootMetadataSigned)>>,
    calls: Vec<ServerCall>,
    put_failures: VecDeque<ServerError>,
}

/// Fake server enforcing the successor rules per branch
#[derive(Clone, Default)]
pub struct FakeMdServer {
    inner: Arc<Mutex<FakeServerState>>,
}

impl FakeMdServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ServerCall> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).calls.clone()
    }

    /// Make the next put fail with `error` before any checks run
    pub fn fail_next_put(&self, error: ServerError) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put_failures
            .push_back(error);
    }

    /// Revisions accepted on the given branch, oldest first
    pub fn history(&self, tlf: &TlfId, bid: BranchId) -> Vec<RootMetadataSigned> {
        let state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state
            .histories
            .get(&(tlf.clone(), bid))
            .map(|h| h.iter().map(|(_, rmds)| rmds.clone()).collect())
            .unwrap_or_default()
    }

    fn check_and_store(
        state: &mut FakeServerState,
        rmds: &RootMetadataSigned,
    ) -> Result<(), ServerError> {
        let md = &rmds.md;
        let revision = md.revision();
        rmds.verify(&FakeCrypto).map_err(|e| ServerError::Rejected {
            revision,
            reason: e.to_string(),
        })?;
        let id = FakeCrypto
            .make_blob_id(md)
            .map_err(|e| ServerError::Rejected {
                revision,
                reason: e.to_string(),
            })?;

        let history = state
            .histories
            .entry((md.tlf_id().clone(), md.branch_id()))
            .or_default();
        if let Some((head_id, head)) = history.last() {
            let expected = head.md.revision().next().unwrap_or(revision);
            if revision != expected {
                return Err(ServerError::ConflictRevision {
                    expected,
                    actual: revision,
                });
            }
            head.md
                .check_valid_successor(*head_id, md)
                .map_err(|e| match e {
                    MetadataError::PrevRootMismatch { .. } => {
                        ServerError::ConflictPrevRoot(revision)
                    }
                    MetadataError::DiskUsageMismatch { .. }
                    | MetadataError::MdDiskUsageMismatch { .. } => {
                        ServerError::ConflictDiskUsage(revision)
                    }
                    other => ServerError::Rejected {
                        revision,
                        reason: other.to_string(),
                    },
                })?;
        }
        history.push((id, rmds.clone()));
        Ok(())
    }
}

impl MdServer for FakeMdServer {
    fn put(&self, rmds: &RootMetadataSigned, extra: Option<&KeyBundles>) -> Result<(), ServerError> {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(ServerCall::Put {
            revision: rmds.md.revision(),
            branch_id: rmds.md.branch_id(),
            with_bundles: extra.is_some(),
        });
        if let Some(error) = state.put_failures.pop_front() {
            return Err(error);
        }
        Self::check_and_store(&mut state, rmds)
    }

    fn get_for_revision(
        &self,
        tlf: &TlfId,
        bid: BranchId,
        _status: MergeStatus,
        revision: Revision,
    ) -> Result<Option<RootMetadataSigned>, ServerError> {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(ServerCall::GetForRevision {
            branch_id: bid,
            revision,
        });
        Ok(state.histories.get(&(tlf.clone(), bid)).and_then(|h| {
            h.iter()
                .find(|(_, rmds)| rmds.md.revision() == revision)
                .map(|(_, rmds)| rmds.clone())
        }))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
