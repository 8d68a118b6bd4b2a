// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced server wrapper for consistent observability

use crate::server::{MdServer, ServerError};
use mdj_core::{BranchId, KeyBundles, MergeStatus, Revision, RootMetadataSigned, TlfId};

/// Wrapper that adds tracing to any MdServer
#[derive(Clone)]
pub struct TracedMdServer<S> {
    inner: S,
}

impl<S> TracedMdServer<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: MdServer> MdServer for TracedMdServer<S> {
    fn put(&self, rmds: &RootMetadataSigned, extra: Option<&KeyBundles>) -> Result<(), ServerError> {
        let md = &rmds.md;
        let span = tracing::info_span!(
            "mdserver.put",
            tlf = %md.tlf_id(),
            revision = %md.revision(),
            branch = %md.branch_id(),
        );
        let _guard = span.enter();

        tracing::debug!(with_bundles = extra.is_some(), "sending");
        let start = std::time::Instant::now();
        let result = self.inner.put(rmds, extra);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => tracing::info!(elapsed_ms, "revision accepted"),
            // Conflicts are an expected part of the flush protocol
            Err(e) if e.is_revision_conflict() => {
                tracing::warn!(elapsed_ms, error = %e, "revision conflict")
            }
            Err(e) => tracing::error!(elapsed_ms, error = %e, "put failed"),
        }

        result
    }

    fn get_for_revision(
        &self,
        tlf: &TlfId,
        bid: BranchId,
        status: MergeStatus,
        revision: Revision,
    ) -> Result<Option<RootMetadataSigned>, ServerError> {
        let span = tracing::info_span!(
            "mdserver.get_for_revision",
            %tlf,
            branch = %bid,
            %status,
            %revision,
        );
        let _guard = span.enter();

        let result = self.inner.get_for_revision(tlf, bid, status, revision);
        match &result {
            Ok(found) => tracing::debug!(found = found.is_some(), "fetched"),
            Err(e) => tracing::error!(error = %e, "fetch failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
