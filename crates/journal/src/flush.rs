// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flushing journaled revisions to the metadata server
//!
//! Flushing is split so that the network call happens outside the journal
//! lock: peek the earliest entry, send it, then remove it once the server
//! has accepted it.

use crate::branch::RewrittenRevision;
use crate::error::JournalError;
use crate::md_journal::MdJournal;
use crate::server::{MdServer, ServerError};
use mdj_core::codec;
use mdj_core::{
    BlobId, BranchId, Clock, Crypto, KeyBundles, MergeStatus, Revision, RootMetadataSigned,
    Signer,
};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// The earliest journaled revision, signed for sending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushEntry {
    pub id: BlobId,
    pub rmds: RootMetadataSigned,
    /// Key bundles the server has not seen yet
    pub extra: Option<KeyBundles>,
}

impl<C: Crypto, K: Clock> MdJournal<C, K> {
    /// Sign the earliest entry for sending if its revision is before `end`
    ///
    /// The entry stays in the journal until
    /// [`remove_flushed_entry`](Self::remove_flushed_entry).
    pub fn get_next_entry_to_flush(
        &self,
        end: Revision,
        signer: &dyn Signer,
    ) -> Result<Option<FlushEntry>, JournalError> {
        self.check_open()?;
        let Some((entry, earliest)) = self.get_earliest(true)? else {
            return Ok(None);
        };
        if earliest.revision() >= end {
            return Ok(None);
        }

        let extra = if entry.writer_bundle_is_new || entry.reader_bundle_is_new {
            earliest.extra
        } else {
            None
        };
        let rmds = RootMetadataSigned::sign(earliest.md, signer, earliest.local_timestamp)?;
        Ok(Some(FlushEntry {
            id: earliest.id,
            rmds,
            extra,
        }))
    }

    /// Drop the earliest entry after the server accepted it
    ///
    /// `id` and `rmds` must match the earliest entry. When this empties the
    /// journal, `id` is remembered as the last known root and every store
    /// directory is removed.
    pub fn remove_flushed_entry(
        &mut self,
        id: BlobId,
        rmds: &RootMetadataSigned,
    ) -> Result<(), JournalError> {
        self.check_open()?;
        let Some((_, earliest)) = self.get_earliest(true)? else {
            return Err(JournalError::InconsistentState(
                "flushed an entry from an empty journal".to_string(),
            ));
        };
        if earliest.id != id {
            return Err(JournalError::InconsistentState(format!(
                "flushed {} but earliest entry is {}",
                id, earliest.id
            )));
        }
        if !codec::equal(&earliest.md, &rmds.md)? {
            return Err(JournalError::InconsistentState(format!(
                "flushed revision {} differs from the stored one",
                rmds.md.revision()
            )));
        }

        let empty = self.j.remove_earliest()?;
        tracing::debug!(%id, revision = %earliest.revision(), empty, "removed flushed entry");
        if empty {
            self.last_flushed_id = Some(id);
            self.j.clear()?;
            self.mds.clear()?;
            self.wkbs.clear()?;
            self.rkbs.clear()?;
        } else {
            self.mds.remove(id)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum FlushError {
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// What one [`flush_one`] call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing before the flush limit
    Empty,
    Flushed { revision: Revision, id: BlobId },
    /// The server already held this exact revision
    AlreadyFlushed { revision: Revision, id: BlobId },
    /// Another writer got there first; the journal moved to a new branch
    ConvertedToBranch {
        branch_id: BranchId,
        rewritten: Vec<RewrittenRevision>,
    },
}

fn lock<C: Crypto, K: Clock>(journal: &Mutex<MdJournal<C, K>>) -> MutexGuard<'_, MdJournal<C, K>> {
    journal.lock().unwrap_or_else(|e| e.into_inner())
}

/// Flush the earliest entry before `end` to `server`
///
/// The journal lock is held only around journal calls, never across a
/// server call. A revision conflict on a merged revision that the server
/// does not already hold moves the journal onto a fresh branch; the
/// caller keeps flushing from there.
pub fn flush_one<C: Crypto, K: Clock, S: MdServer>(
    journal: &Mutex<MdJournal<C, K>>,
    signer: &dyn Signer,
    server: &S,
    end: Revision,
) -> Result<FlushOutcome, FlushError> {
    let next = lock(journal).get_next_entry_to_flush(end, signer)?;
    let Some(entry) = next else {
        return Ok(FlushOutcome::Empty);
    };
    let md = &entry.rmds.md;
    let revision = md.revision();

    let err = match server.put(&entry.rmds, entry.extra.as_ref()) {
        Ok(()) => {
            lock(journal).remove_flushed_entry(entry.id, &entry.rmds)?;
            tracing::info!(%revision, id = %entry.id, "flushed revision");
            return Ok(FlushOutcome::Flushed {
                revision,
                id: entry.id,
            });
        }
        Err(e) if e.is_revision_conflict() => e,
        Err(e) => return Err(e.into()),
    };

    let on_server = server.get_for_revision(md.tlf_id(), md.branch_id(), md.merge_status(), revision)?;

    let mut j = lock(journal);
    if let Some(on_server) = on_server {
        let server_id = j
            .crypto
            .make_blob_id(&on_server.md)
            .map_err(JournalError::from)?;
        if server_id == entry.id {
            tracing::info!(%revision, id = %entry.id, "revision was already flushed");
            j.remove_flushed_entry(entry.id, &entry.rmds)?;
            return Ok(FlushOutcome::AlreadyFlushed {
                revision,
                id: entry.id,
            });
        }
    }

    if md.merge_status() != MergeStatus::Merged {
        return Err(err.into());
    }
    let branch_id = j.crypto.make_random_branch_id();
    tracing::info!(%revision, branch = %branch_id, "conflict on merged revision, converting to branch");
    let rewritten = j.convert_to_branch(signer, branch_id)?;
    Ok(FlushOutcome::ConvertedToBranch {
        branch_id,
        rewritten,
    })
}

#[cfg(test)]
#[path = "flush_tests.rs"]
mod tests;
