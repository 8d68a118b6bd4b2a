// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metadata journal for one folder on one device
//!
//! Directory layout under the journal's `dir`:
//!
//! ```text
//! journal.lock          exclusive lock held while open
//! md_journal/           revision index (EARLIEST, LATEST, one file per revision)
//! mds/                  metadata blobs by content hash
//! wkbv3/, rkbv3/        key bundles by content hash
//! ```
//!
//! ## put
//!
//! A revision's handling depends on its merge status and the journal's branch:
//!
//! - Merged onto the null branch: append or replace the head.
//! - Merged onto any other branch: [`JournalError::Conflict`]; the caller
//!   marks the revision unmerged and retries.
//! - Unmerged without a branch ID: adopt the journal's branch and chain onto
//!   the last known root (the head, or the last flushed revision).
//! - Unmerged with a branch ID while the journal has never held an entry:
//!   the revision's branch becomes the journal's branch.
//! - Unmerged with the journal's own branch ID: append or replace.
//!
//! Replacing the head (same revision as the head) lets a caller safely retry
//! a put whose outcome it never learned.

use crate::config::JournalConfig;
use crate::error::JournalError;
use crate::recovery;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use mdj_core::metadata::{ReaderKeyBundleV3, WriterKeyBundleV3};
use mdj_core::{
    BlobId, BranchId, Clock, Crypto, KeyBundles, MergeStatus, Revision, RootMetadata, Signer,
    TlfId, UserId, VerifyingKey,
};
use mdj_storage::{JournalEntry, KeyBundleStore, MdStore, RevisionJournal};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "journal.lock";

/// A journaled revision as read back from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImmutableMetadata {
    pub md: RootMetadata,
    pub id: BlobId,
    pub extra: Option<KeyBundles>,
    /// When the revision was first stored locally
    pub local_timestamp: DateTime<Utc>,
}

impl ImmutableMetadata {
    pub fn revision(&self) -> Revision {
        self.md.revision()
    }
}

/// Orchestrates the revision index, blob store and key bundle stores
///
/// Not internally synchronized: mutators take `&mut self`, and sharing across
/// threads goes through an outer lock (see [`crate::flush_one`]).
pub struct MdJournal<C: Crypto, K: Clock> {
    pub(crate) uid: UserId,
    pub(crate) key: VerifyingKey,
    pub(crate) tlf_id: TlfId,
    pub(crate) crypto: C,
    pub(crate) clock: K,
    pub(crate) config: JournalConfig,
    pub(crate) dir: PathBuf,
    pub(crate) j: RevisionJournal,
    pub(crate) mds: MdStore<C>,
    pub(crate) wkbs: KeyBundleStore<WriterKeyBundleV3, C>,
    pub(crate) rkbs: KeyBundleStore<ReaderKeyBundleV3, C>,
    pub(crate) branch_id: BranchId,
    /// ID of the last flushed revision while the journal is empty
    pub(crate) last_flushed_id: Option<BlobId>,
    /// Held for the journal's lifetime; released on drop
    _lock: Option<File>,
    shut_down: bool,
}

impl<C: Crypto, K: Clock> MdJournal<C, K> {
    /// Open (or create) the journal in `dir`
    ///
    /// Takes the directory lock, recovers from an interrupted index rewrite,
    /// then restores the branch ID from the stored entries.
    pub fn open(
        config: JournalConfig,
        dir: impl Into<PathBuf>,
        uid: UserId,
        key: VerifyingKey,
        tlf_id: TlfId,
        crypto: C,
        clock: K,
    ) -> Result<Self, JournalError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let lock_path = dir.join(LOCK_FILE);
        let lock = File::create(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|source| JournalError::Locked {
                path: lock_path,
                source,
            })?;

        recovery::recover(&dir, &config)?;

        let index = RevisionJournal::open(dir.join(&config.journal_dir_name), config.sync_writes)?;
        let mut journal =
            Self::with_index(config, dir, index, uid, key, tlf_id, crypto, clock)?;
        journal._lock = Some(lock);
        Ok(journal)
    }

    /// Build a journal over an existing index, sharing this journal's stores
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn with_index(
        config: JournalConfig,
        dir: PathBuf,
        index: RevisionJournal,
        uid: UserId,
        key: VerifyingKey,
        tlf_id: TlfId,
        crypto: C,
        clock: K,
    ) -> Result<Self, JournalError> {
        let mds = MdStore::new(
            dir.join(&config.mds_dir_name),
            crypto.clone(),
            config.sync_writes,
            config.metadata_version,
        );
        let wkbs = KeyBundleStore::new(
            dir.join(&config.writer_bundles_dir_name),
            crypto.clone(),
            config.sync_writes,
        );
        let rkbs = KeyBundleStore::new(
            dir.join(&config.reader_bundles_dir_name),
            crypto.clone(),
            config.sync_writes,
        );
        let mut journal = Self {
            uid,
            key,
            tlf_id,
            crypto,
            clock,
            config,
            dir,
            j: index,
            mds,
            wkbs,
            rkbs,
            branch_id: BranchId::NULL,
            last_flushed_id: None,
            _lock: None,
            shut_down: false,
        };
        journal.branch_id = journal.initial_branch_id()?;
        Ok(journal)
    }

    fn initial_branch_id(&self) -> Result<BranchId, JournalError> {
        let earliest = self.get_earliest(false)?;
        let latest = self.get_latest(false)?;
        let (earliest, latest) = match (earliest, latest) {
            (None, None) => return Ok(BranchId::NULL),
            (Some(earliest), Some(latest)) => (earliest, latest),
            (earliest, latest) => {
                return Err(JournalError::InconsistentState(format!(
                    "has earliest={} but has latest={}",
                    earliest.is_some(),
                    latest.is_some()
                )))
            }
        };

        let bid = latest.1.md.branch_id();
        let earliest_bid = earliest.1.md.branch_id();
        // A pending squash keeps its already-squashed prefix on the null branch
        let squash_prefix =
            earliest.0.is_local_squash && earliest_bid.is_null() && bid.is_pending_local_squash();
        if earliest_bid != bid && !squash_prefix {
            return Err(JournalError::InconsistentState(format!(
                "earliest branch {} differs from latest branch {}",
                earliest_bid, bid
            )));
        }
        tracing::debug!(branch = %bid, "initializing journal");
        Ok(bid)
    }

    pub(crate) fn check_open(&self) -> Result<(), JournalError> {
        if self.shut_down {
            return Err(JournalError::ShutDown);
        }
        Ok(())
    }

    /// Mark the journal unavailable; later calls fail with [`JournalError::ShutDown`]
    pub fn shutdown(&mut self) {
        tracing::debug!(tlf = %self.tlf_id, "shutting down journal");
        self.shut_down = true;
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tlf_id(&self) -> &TlfId {
        &self.tlf_id
    }

    pub fn branch_id(&self) -> BranchId {
        self.branch_id
    }

    /// The last flushed revision's ID, remembered only while the journal is empty
    pub fn last_flushed_id(&self) -> Option<BlobId> {
        self.last_flushed_id
    }

    pub fn length(&self) -> Result<u64, JournalError> {
        self.check_open()?;
        Ok(self.j.length()?)
    }

    /// One past the latest revision, or [`Revision::UNINITIALIZED`] when empty
    pub fn end(&self) -> Result<Revision, JournalError> {
        self.check_open()?;
        Ok(self.j.end()?)
    }

    pub fn read_earliest_revision(&self) -> Result<Revision, JournalError> {
        self.check_open()?;
        Ok(self.j.read_earliest_revision()?)
    }

    pub fn read_latest_revision(&self) -> Result<Revision, JournalError> {
        self.check_open()?;
        Ok(self.j.read_latest_revision()?)
    }

    pub(crate) fn get_extra(&self, md: &RootMetadata) -> Result<Option<KeyBundles>, JournalError> {
        match md.key_bundle_ids()? {
            Some((wkb, rkb)) => Ok(Some(KeyBundles {
                writer: self.wkbs.get(wkb)?,
                reader: self.rkbs.get(rkb)?,
            })),
            None => Ok(None),
        }
    }

    /// Read and fully verify the blob stored under `id`
    pub(crate) fn get_md_and_extra(
        &self,
        id: BlobId,
        verify_branch_id: bool,
    ) -> Result<ImmutableMetadata, JournalError> {
        let stored = self.mds.get(id)?;
        let md = stored.md;
        if md.tlf_id() != &self.tlf_id {
            return Err(JournalError::Integrity(format!(
                "blob {} belongs to folder {}, not {}",
                id,
                md.tlf_id(),
                self.tlf_id
            )));
        }
        md.is_last_modified_by(&self.uid, &self.key)?;
        let extra = self.get_extra(&md)?;
        md.is_valid_and_signed(&self.crypto, extra.as_ref())?;

        if verify_branch_id && md.branch_id() != self.branch_id {
            let in_squash_prefix =
                md.branch_id().is_null() && self.branch_id.is_pending_local_squash();
            if !in_squash_prefix {
                return Err(JournalError::BranchMismatch {
                    expected: self.branch_id,
                    actual: md.branch_id(),
                });
            }
        }

        Ok(ImmutableMetadata {
            md,
            id,
            extra,
            local_timestamp: stored.timestamp,
        })
    }

    /// Read the blob behind an index entry and check it holds `revision`
    fn get_indexed(
        &self,
        revision: Revision,
        entry: JournalEntry,
        verify_branch_id: bool,
    ) -> Result<(JournalEntry, ImmutableMetadata), JournalError> {
        let md = self.get_md_and_extra(entry.id, verify_branch_id)?;
        if md.revision() != revision {
            return Err(JournalError::Integrity(format!(
                "entry for revision {} holds revision {}",
                revision,
                md.revision()
            )));
        }
        Ok((entry, md))
    }

    pub(crate) fn get_earliest(
        &self,
        verify_branch_id: bool,
    ) -> Result<Option<(JournalEntry, ImmutableMetadata)>, JournalError> {
        match self.j.get_earliest_entry()? {
            Some((revision, entry)) => self.get_indexed(revision, entry, verify_branch_id).map(Some),
            None => Ok(None),
        }
    }

    pub(crate) fn get_latest(
        &self,
        verify_branch_id: bool,
    ) -> Result<Option<(JournalEntry, ImmutableMetadata)>, JournalError> {
        match self.j.get_latest_entry()? {
            Some((revision, entry)) => self.get_indexed(revision, entry, verify_branch_id).map(Some),
            None => Ok(None),
        }
    }

    /// The entry before the head, if the journal holds more than one
    fn get_before_latest(&self) -> Result<Option<(JournalEntry, ImmutableMetadata)>, JournalError> {
        let earliest = self.j.read_earliest_revision()?;
        let latest = self.j.read_latest_revision()?;
        if latest <= earliest {
            return Ok(None);
        }
        let revision = Revision(latest.0 - 1);
        let entry = self.j.get_entry(revision)?;
        self.get_indexed(revision, entry, false).map(Some)
    }

    /// All index entries, earliest first
    pub(crate) fn all_entries(&self) -> Result<Vec<(Revision, JournalEntry)>, JournalError> {
        let earliest = match self.j.read_earliest_revision() {
            Ok(earliest) => earliest,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let latest = self.j.read_latest_revision()?;
        let (start, entries) = self.j.get_entry_range(earliest, latest)?;
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| (Revision(start.0 + i as u64), entry))
            .collect())
    }

    fn check_reader(&self, head: &ImmutableMetadata) -> Result<(), JournalError> {
        if !head.md.writers().contains(&self.uid) {
            return Err(JournalError::Unauthorized(self.uid.clone()));
        }
        Ok(())
    }

    /// Which entries a query for branch `bid` may see
    fn visible(&self, bid: BranchId, entry: &JournalEntry) -> bool {
        if !self.branch_id.is_pending_local_squash() {
            return bid == self.branch_id;
        }
        if bid.is_null() {
            entry.is_local_squash
        } else if bid.is_pending_local_squash() {
            !entry.is_local_squash
        } else {
            false
        }
    }

    /// The newest revision on branch `bid`, if the journal holds one
    pub fn get_head(&self, bid: BranchId) -> Result<Option<ImmutableMetadata>, JournalError> {
        self.check_open()?;
        let Some((entry, head)) = self.get_latest(true)? else {
            return Ok(None);
        };
        self.check_reader(&head)?;
        if self.visible(bid, &entry) {
            return Ok(Some(head));
        }
        if bid.is_null() && self.branch_id.is_pending_local_squash() {
            // Head is past the squash prefix; report the prefix's last entry
            let prefix_head = self
                .all_entries()?
                .into_iter()
                .take_while(|(_, e)| e.is_local_squash)
                .last();
            return match prefix_head {
                Some((_, e)) => Ok(Some(self.get_md_and_extra(e.id, true)?)),
                None => Ok(None),
            };
        }
        Ok(None)
    }

    /// Revisions `start..=stop` on branch `bid`, clamped to what the journal holds
    pub fn get_range(
        &self,
        bid: BranchId,
        start: Revision,
        stop: Revision,
    ) -> Result<Vec<ImmutableMetadata>, JournalError> {
        self.check_open()?;
        let Some((_, head)) = self.get_latest(true)? else {
            return Ok(Vec::new());
        };
        self.check_reader(&head)?;

        let (real_start, entries) = self.j.get_entry_range(start, stop)?;
        let mut mds = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if !self.visible(bid, entry) {
                continue;
            }
            let expected = Revision(real_start.0 + i as u64);
            let md = self.get_md_and_extra(entry.id, true)?;
            if md.revision() != expected {
                return Err(JournalError::Integrity(format!(
                    "entry for revision {} holds revision {}",
                    expected,
                    md.revision()
                )));
            }
            mds.push(md);
        }
        Ok(mds)
    }

    /// Store key bundles for `md`
    fn put_extra(&self, md: &RootMetadata, extra: Option<&KeyBundles>) -> Result<(), JournalError> {
        let (Some((wkb, rkb)), Some(bundles)) = (md.key_bundle_ids()?, extra) else {
            return Ok(());
        };
        self.wkbs.put(wkb, &bundles.writer)?;
        self.rkbs.put(rkb, &bundles.reader)?;
        Ok(())
    }

    /// Which of `md`'s bundles differ from those of the revision it follows
    ///
    /// With nothing before it in the journal, both bundles count as new.
    fn bundles_are_new(
        md: &RootMetadata,
        prev: Option<&ImmutableMetadata>,
    ) -> Result<(bool, bool), JournalError> {
        let Some((wkb, rkb)) = md.key_bundle_ids()? else {
            return Ok((false, false));
        };
        let prev_ids = match prev {
            Some(prev) => prev.md.key_bundle_ids()?,
            None => None,
        };
        Ok(match prev_ids {
            Some((prev_wkb, prev_rkb)) => (wkb != prev_wkb, rkb != prev_rkb),
            None => (true, true),
        })
    }

    /// Validate and store `md`, returning its blob ID
    ///
    /// `md` is modified as described in the module docs and signed
    /// internally where its version requires it.
    pub fn put(
        &mut self,
        signer: &dyn Signer,
        md: RootMetadata,
        extra: Option<&KeyBundles>,
        is_local_squash: bool,
    ) -> Result<BlobId, JournalError> {
        self.check_open()?;
        let revision = md.revision();
        let md_branch = md.branch_id();
        tracing::debug!(
            tlf = %md.tlf_id(),
            %revision,
            branch = %md_branch,
            is_local_squash,
            "putting metadata"
        );
        let result = self.put_inner(signer, md, extra, is_local_squash);
        if let Err(e) = &result {
            tracing::debug!(%revision, branch = %md_branch, error = %e, "put failed");
        }
        result
    }

    fn put_inner(
        &mut self,
        signer: &dyn Signer,
        mut md: RootMetadata,
        extra: Option<&KeyBundles>,
        is_local_squash: bool,
    ) -> Result<BlobId, JournalError> {
        if md.tlf_id() != &self.tlf_id {
            return Err(JournalError::InconsistentState(format!(
                "revision {} belongs to folder {}, not {}",
                md.revision(),
                md.tlf_id(),
                self.tlf_id
            )));
        }
        let extra = match extra {
            Some(extra) => Some(extra.clone()),
            None => self.get_extra(&md)?,
        };
        let head = self.get_latest(true)?;
        let status = md.merge_status();

        let mut journal_bid = self.branch_id;
        if status == MergeStatus::Unmerged {
            if md.branch_id().is_null() && self.branch_id.is_null() {
                return Err(JournalError::InconsistentState(
                    "unmerged put with a null branch on both revision and journal".to_string(),
                ));
            }
            if head.is_none() && self.branch_id.is_null() {
                // First entry establishes the branch
                journal_bid = md.branch_id();
            } else if md.branch_id().is_null() {
                let prev_root = match &head {
                    // Replacing the head keeps the head's own link
                    Some((_, h)) if h.revision() == md.revision() => h.md.prev_root(),
                    Some((_, h)) => Some(h.id),
                    None => self.last_flushed_id,
                };
                tracing::debug!(
                    branch = %self.branch_id,
                    prev_root = ?prev_root,
                    revision = %md.revision(),
                    "moving unmerged revision onto journal branch"
                );
                md.set_branch_id(self.branch_id);
                md.set_prev_root(prev_root);
            }
        }

        if (status == MergeStatus::Merged) != md.branch_id().is_null() {
            return Err(JournalError::InconsistentState(format!(
                "merge status {} does not match branch {}",
                status,
                md.branch_id()
            )));
        }
        if status == MergeStatus::Merged && !journal_bid.is_null() {
            return Err(JournalError::Conflict(journal_bid));
        }
        if md.branch_id() != journal_bid {
            return Err(JournalError::BranchMismatch {
                expected: journal_bid,
                actual: md.branch_id(),
            });
        }

        let replace_head = matches!(&head, Some((_, h)) if h.revision() == md.revision());
        let before_head = if replace_head {
            self.get_before_latest()?
        } else {
            None
        };
        // The entry the new revision follows once stored
        let prev = if replace_head {
            before_head.as_ref()
        } else {
            head.as_ref()
        };

        if let Some((_, h)) = &head {
            if !h.md.writers().contains(&self.uid) {
                return Err(JournalError::Unauthorized(self.uid.clone()));
            }
            if !replace_head {
                h.md.check_valid_successor(h.id, &md)
                    .map_err(JournalError::InvalidSuccessor)?;
            }
        }
        if let Some((prev_entry, p)) = prev {
            if is_local_squash && !prev_entry.is_local_squash {
                return Err(JournalError::InconsistentState(format!(
                    "local squash at revision {} cannot follow non-squash revision {}",
                    md.revision(),
                    p.revision()
                )));
            }
        }

        md.sign_writer_metadata_internally(signer)?;
        md.is_last_modified_by(&self.uid, &self.key)?;
        md.is_valid_and_signed(&self.crypto, extra.as_ref())?;

        self.put_extra(&md, extra.as_ref())?;
        let (writer_new, reader_new) = Self::bundles_are_new(&md, prev.map(|(_, p)| p))?;
        let id = self.mds.put(&md, self.clock.now())?;

        let mut entry = JournalEntry::new(id);
        entry.is_local_squash = is_local_squash;
        entry.writer_bundle_is_new = writer_new;
        entry.reader_bundle_is_new = reader_new;
        if replace_head {
            tracing::debug!(revision = %md.revision(), "replacing head");
            self.j.replace_head(&entry)?;
        } else {
            self.j.append(md.revision(), &entry)?;
        }

        if journal_bid != self.branch_id {
            tracing::info!(branch = %journal_bid, "journal adopted branch");
            self.branch_id = journal_bid;
        }
        self.last_flushed_id = None;
        Ok(id)
    }
}

#[cfg(test)]
#[path = "md_journal_tests.rs"]
mod tests;
