// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Revision-indexed journal entries
//!
//! A [`DiskJournal`] whose ordinals are metadata revisions.

use crate::disk_journal::{DiskJournal, JournalOrdinal};
use crate::error::StorageError;
use mdj_core::{BlobId, Revision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Index entry for one journaled revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: BlobId,
    /// Result of a local squash; never squashed again
    #[serde(default)]
    pub is_local_squash: bool,
    /// The writer key bundle must be sent along with this revision
    #[serde(default)]
    pub writer_bundle_is_new: bool,
    /// The reader key bundle must be sent along with this revision
    #[serde(default)]
    pub reader_bundle_is_new: bool,
    /// Fields written by newer clients, kept verbatim
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

impl JournalEntry {
    pub fn new(id: BlobId) -> Self {
        Self {
            id,
            is_local_squash: false,
            writer_bundle_is_new: false,
            reader_bundle_is_new: false,
            unknown: BTreeMap::new(),
        }
    }
}

fn ordinal_of(revision: Revision) -> Result<JournalOrdinal, StorageError> {
    if !revision.is_valid() {
        return Err(StorageError::InvalidRevision(revision));
    }
    Ok(JournalOrdinal(revision.0))
}

fn revision_of(ordinal: JournalOrdinal) -> Result<Revision, StorageError> {
    let revision = Revision(ordinal.0);
    if !revision.is_valid() {
        return Err(StorageError::Integrity(format!(
            "ordinal {} is not a valid revision",
            ordinal
        )));
    }
    Ok(revision)
}

/// Journal of [`JournalEntry`] values keyed by revision
#[derive(Debug)]
pub struct RevisionJournal {
    journal: DiskJournal<JournalEntry>,
}

impl RevisionJournal {
    pub fn open(dir: impl Into<PathBuf>, sync_writes: bool) -> Result<Self, StorageError> {
        Ok(Self {
            journal: DiskJournal::open(dir, sync_writes)?,
        })
    }

    pub fn dir(&self) -> &Path {
        self.journal.dir()
    }

    pub fn length(&self) -> Result<u64, StorageError> {
        self.journal.length()
    }

    /// One past the latest revision, or [`Revision::UNINITIALIZED`] when empty
    pub fn end(&self) -> Result<Revision, StorageError> {
        match self.journal.read_latest_ordinal() {
            Ok(latest) => revision_of(latest)?
                .next()
                .ok_or_else(|| StorageError::Integrity("revision overflow".to_string())),
            Err(e) if e.is_not_found() => Ok(Revision::UNINITIALIZED),
            Err(e) => Err(e),
        }
    }

    pub fn read_earliest_revision(&self) -> Result<Revision, StorageError> {
        revision_of(self.journal.read_earliest_ordinal()?)
    }

    pub fn read_latest_revision(&self) -> Result<Revision, StorageError> {
        revision_of(self.journal.read_latest_ordinal()?)
    }

    pub fn get_entry(&self, revision: Revision) -> Result<JournalEntry, StorageError> {
        self.journal.read(ordinal_of(revision)?)
    }

    fn get_edge_entry(
        &self,
        revision: Result<Revision, StorageError>,
    ) -> Result<Option<(Revision, JournalEntry)>, StorageError> {
        let revision = match revision {
            Ok(revision) => revision,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some((revision, self.get_entry(revision)?)))
    }

    pub fn get_earliest_entry(&self) -> Result<Option<(Revision, JournalEntry)>, StorageError> {
        self.get_edge_entry(self.read_earliest_revision())
    }

    pub fn get_latest_entry(&self) -> Result<Option<(Revision, JournalEntry)>, StorageError> {
        self.get_edge_entry(self.read_latest_revision())
    }

    /// Entries for `start..=stop`, clamped to what the journal holds
    ///
    /// Returns the first revision actually covered along with the entries.
    pub fn get_entry_range(
        &self,
        start: Revision,
        stop: Revision,
    ) -> Result<(Revision, Vec<JournalEntry>), StorageError> {
        let earliest = match self.read_earliest_revision() {
            Ok(earliest) => earliest,
            Err(e) if e.is_not_found() => return Ok((start, Vec::new())),
            Err(e) => return Err(e),
        };
        let latest = self.read_latest_revision()?;
        let start = start.max(earliest);
        let stop = stop.min(latest);
        if stop < start {
            return Ok((start, Vec::new()));
        }
        let entries = (start.0..=stop.0)
            .map(|n| self.get_entry(Revision(n)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((start, entries))
    }

    pub fn append(&self, revision: Revision, entry: &JournalEntry) -> Result<(), StorageError> {
        self.journal.append_at(ordinal_of(revision)?, entry)
    }

    /// Overwrite the latest entry
    pub fn replace_head(&self, entry: &JournalEntry) -> Result<(), StorageError> {
        let latest = self.journal.read_latest_ordinal()?;
        self.journal.write_entry(latest, entry)
    }

    pub fn remove_earliest(&self) -> Result<bool, StorageError> {
        self.journal.remove_earliest()
    }

    /// Drop every entry at or after `revision`
    pub fn clear_from(&self, revision: Revision) -> Result<(), StorageError> {
        self.journal.truncate_from(ordinal_of(revision)?)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.journal.clear()
    }

    pub fn move_to(&mut self, new_dir: impl Into<PathBuf>) -> Result<PathBuf, StorageError> {
        self.journal.move_to(new_dir)
    }
}

#[cfg(test)]
#[path = "revision_journal_tests.rs"]
mod tests;
