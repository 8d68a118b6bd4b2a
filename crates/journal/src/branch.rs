// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Branch state transitions
//!
//! Index rewrites build a complete new index in a temporary directory and
//! swap it in with two renames; see [`crate::recovery`] for the crash case.

use crate::error::JournalError;
use crate::md_journal::MdJournal;
use crate::recovery::{NEW_INDEX_DIR, OLD_INDEX_DIR};
use mdj_core::{BlobId, BranchId, Clock, Crypto, KeyBundles, Revision, RootMetadata, Signer};
use mdj_storage::RevisionJournal;
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;

/// One entry rewritten by [`MdJournal::convert_to_branch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewrittenRevision {
    pub revision: Revision,
    pub old_id: BlobId,
    pub new_id: BlobId,
}

/// Result of [`MdJournal::resolve_and_clear`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: BlobId,
    /// Revisions of the cleared branch; cached copies are stale
    pub superseded: Vec<Revision>,
}

impl<C: Crypto, K: Clock> MdJournal<C, K> {
    fn rewrite_dir(&self) -> Result<TempDir, JournalError> {
        Ok(tempfile::Builder::new()
            .prefix(&self.config.temp_dir_prefix())
            .tempdir_in(&self.dir)?)
    }

    fn live_index_dir(&self) -> std::path::PathBuf {
        self.dir.join(&self.config.journal_dir_name)
    }

    /// Swap `new_index` in for the live index
    fn swap_index(&mut self, tmp: &Path, mut new_index: RevisionJournal) -> Result<(), JournalError> {
        let live = self.live_index_dir();
        // A flushed-out journal may have no index directory at all
        let old = if live.exists() {
            Some(self.j.move_to(tmp.join(OLD_INDEX_DIR))?)
        } else {
            None
        };
        if let Err(e) = new_index.move_to(&live) {
            // Put the old index back so the journal stays usable
            if let Some(old) = old {
                self.j.move_to(old)?;
            }
            return Err(e.into());
        }
        self.j = new_index;
        Ok(())
    }

    fn remove_blobs(&self, ids: impl IntoIterator<Item = BlobId>) {
        for id in ids {
            if let Err(e) = self.mds.remove(id) {
                tracing::warn!(%id, error = %e, "could not remove metadata blob");
            }
        }
    }

    /// Rewrite every entry onto branch `bid`
    ///
    /// Entries become unmerged, are re-signed, and are relinked to their
    /// rewritten predecessor. Converting to the pending-squash branch leaves
    /// the leading local-squash entries untouched. The live index is only
    /// replaced once every entry has been rewritten.
    pub fn convert_to_branch(
        &mut self,
        signer: &dyn Signer,
        bid: BranchId,
    ) -> Result<Vec<RewrittenRevision>, JournalError> {
        self.check_open()?;
        if bid.is_null() {
            return Err(JournalError::InconsistentState(
                "cannot convert to the null branch".to_string(),
            ));
        }
        if !self.branch_id.is_null() {
            return Err(JournalError::InconsistentState(format!(
                "journal is already on branch {}",
                self.branch_id
            )));
        }

        let entries = self.all_entries()?;
        if entries.is_empty() {
            tracing::info!(branch = %bid, "setting branch of empty journal");
            self.branch_id = bid;
            return Ok(Vec::new());
        }

        let tmp = self.rewrite_dir()?;
        let new_index =
            RevisionJournal::open(tmp.path().join(NEW_INDEX_DIR), self.config.sync_writes)?;

        let mut rewritten = Vec::new();
        let result = self.rewrite_entries(signer, bid, &entries, &new_index, &mut rewritten);
        if let Err(e) = result {
            tracing::warn!(branch = %bid, error = %e, "branch conversion failed, discarding");
            self.remove_blobs(rewritten.iter().map(|r| r.new_id));
            return Err(e);
        }

        if let Err(e) = self.swap_index(tmp.path(), new_index) {
            self.remove_blobs(rewritten.iter().map(|r| r.new_id));
            return Err(e);
        }
        self.branch_id = bid;

        let kept: HashSet<BlobId> = rewritten.iter().map(|r| r.new_id).collect();
        self.remove_blobs(
            rewritten
                .iter()
                .map(|r| r.old_id)
                .filter(|id| !kept.contains(id)),
        );
        if let Err(e) = tmp.close() {
            tracing::warn!(error = %e, "could not remove rewrite directory");
        }

        tracing::info!(branch = %bid, count = rewritten.len(), "converted journal to branch");
        Ok(rewritten)
    }

    fn rewrite_entries(
        &self,
        signer: &dyn Signer,
        bid: BranchId,
        entries: &[(Revision, mdj_storage::JournalEntry)],
        new_index: &RevisionJournal,
        rewritten: &mut Vec<RewrittenRevision>,
    ) -> Result<(), JournalError> {
        let mut prev_id: Option<BlobId> = None;
        for (revision, entry) in entries {
            if bid.is_pending_local_squash() && entry.is_local_squash && rewritten.is_empty() {
                new_index.append(*revision, entry)?;
                prev_id = Some(entry.id);
                continue;
            }

            let ibrmd = self.get_md_and_extra(entry.id, true)?;
            let mut md = ibrmd.md;
            md.set_unmerged();
            md.set_branch_id(bid);
            if prev_id.is_some() {
                md.set_prev_root(prev_id);
            }
            md.sign_writer_metadata_internally(signer)?;
            let new_id = self.mds.put(&md, ibrmd.local_timestamp)?;
            rewritten.push(RewrittenRevision {
                revision: *revision,
                old_id: entry.id,
                new_id,
            });

            let mut new_entry = entry.clone();
            new_entry.id = new_id;
            new_index.append(*revision, &new_entry)?;
            tracing::debug!(%revision, old = %entry.id, new = %new_id, "rewrote entry");
            prev_id = Some(new_id);
        }
        Ok(())
    }

    /// Replace branch `bid` with the single merged revision `md`
    ///
    /// On the pending-squash branch the squash prefix is kept and `md`
    /// follows it. The resolution is recorded as a local squash, and the
    /// journal returns to the null branch.
    pub fn resolve_and_clear(
        &mut self,
        signer: &dyn Signer,
        bid: BranchId,
        md: RootMetadata,
        extra: Option<&KeyBundles>,
    ) -> Result<Resolution, JournalError> {
        self.check_open()?;
        if !md.branch_id().is_null() {
            return Err(JournalError::InconsistentState(format!(
                "resolution revision {} is on branch {}",
                md.revision(),
                md.branch_id()
            )));
        }
        if bid.is_null() {
            return Err(JournalError::InconsistentState(
                "cannot resolve the null branch".to_string(),
            ));
        }
        if bid != self.branch_id {
            return Err(JournalError::BranchMismatch {
                expected: self.branch_id,
                actual: bid,
            });
        }

        let entries = self.all_entries()?;
        let prefix_len = if bid.is_pending_local_squash() {
            entries.iter().take_while(|(_, e)| e.is_local_squash).count()
        } else {
            0
        };

        let tmp = self.rewrite_dir()?;
        let other_index =
            RevisionJournal::open(tmp.path().join(NEW_INDEX_DIR), self.config.sync_writes)?;
        for (revision, entry) in &entries[..prefix_len] {
            other_index.append(*revision, entry)?;
        }

        let mut other = MdJournal::with_index(
            self.config.clone(),
            self.dir.clone(),
            other_index,
            self.uid.clone(),
            self.key.clone(),
            self.tlf_id.clone(),
            self.crypto.clone(),
            self.clock.clone(),
        )?;
        let id = other.put(signer, md, extra, true)?;
        let MdJournal { j: new_index, .. } = other;

        self.swap_index(tmp.path(), new_index)?;
        self.branch_id = BranchId::NULL;

        let superseded = &entries[prefix_len..];
        self.remove_blobs(
            superseded
                .iter()
                .map(|(_, e)| e.id)
                .filter(|old| *old != id),
        );
        if let Err(e) = tmp.close() {
            tracing::warn!(error = %e, "could not remove rewrite directory");
        }

        tracing::info!(
            branch = %bid,
            resolution = %id,
            superseded = superseded.len(),
            "resolved branch"
        );
        Ok(Resolution {
            id,
            superseded: superseded.iter().map(|(revision, _)| *revision).collect(),
        })
    }

    /// Drop branch `bid` and return to the null branch
    ///
    /// Clearing a branch the journal is not on does nothing. On the
    /// pending-squash branch only entries after the squash prefix go.
    pub fn clear(&mut self, bid: BranchId) -> Result<(), JournalError> {
        self.check_open()?;
        if bid.is_null() {
            return Err(JournalError::InconsistentState(
                "cannot clear the null branch".to_string(),
            ));
        }
        if bid != self.branch_id {
            tracing::debug!(branch = %bid, current = %self.branch_id, "ignoring clear of other branch");
            return Ok(());
        }

        let entries = self.all_entries()?;
        if entries.is_empty() {
            self.branch_id = BranchId::NULL;
            return Ok(());
        }

        let prefix_len = if bid.is_pending_local_squash() {
            entries.iter().take_while(|(_, e)| e.is_local_squash).count()
        } else {
            0
        };
        match entries.get(prefix_len) {
            Some((first_cleared, _)) if prefix_len > 0 => self.j.clear_from(*first_cleared)?,
            Some(_) => self.j.clear()?,
            None => {}
        }
        self.branch_id = BranchId::NULL;

        self.remove_blobs(entries[prefix_len..].iter().map(|(_, e)| e.id));
        tracing::info!(
            branch = %bid,
            cleared = entries.len() - prefix_len,
            kept = prefix_len,
            "cleared branch"
        );
        Ok(())
    }

    /// Mark the head as a local squash in place
    ///
    /// Only valid on the null branch. The entry before the head, if any,
    /// must already be a local squash.
    pub fn mark_latest_as_local_squash(&mut self) -> Result<(), JournalError> {
        self.check_open()?;
        if !self.branch_id.is_null() {
            return Err(JournalError::InconsistentState(format!(
                "cannot mark a squash while on branch {}",
                self.branch_id
            )));
        }
        let Some((latest, mut entry)) = self.j.get_latest_entry()? else {
            return Ok(());
        };
        if entry.is_local_squash {
            return Ok(());
        }
        let earliest = self.j.read_earliest_revision()?;
        if latest > earliest {
            let prev = self.j.get_entry(Revision(latest.0 - 1))?;
            if !prev.is_local_squash {
                return Err(JournalError::InconsistentState(format!(
                    "revision {} follows non-squash revision {}",
                    latest,
                    latest.0 - 1
                )));
            }
        }
        entry.is_local_squash = true;
        self.j.replace_head(&entry)?;
        tracing::debug!(revision = %latest, "marked head as local squash");
        Ok(())
    }

    /// Whether the last `n` entries exist and the oldest of them is not a squash
    pub fn at_least_n_non_local_squashes(&self, n: u64) -> Result<bool, JournalError> {
        self.check_open()?;
        if n == 0 {
            return Ok(true);
        }
        if self.j.length()? < n {
            return Ok(false);
        }
        let latest = self.j.read_latest_revision()?;
        let entry = self.j.get_entry(Revision(latest.0 + 1 - n))?;
        Ok(!entry.is_local_squash)
    }
}

#[cfg(test)]
#[path = "branch_tests.rs"]
mod tests;
