// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only log of ordinal-numbered entry files
//!
//! Each entry lives in its own file named by its ordinal. Two marker files,
//! `EARLIEST` and `LATEST`, bound the committed range. Entry files are always
//! written before the markers move, so a crash mid-append leaves at worst an
//! orphan entry file past `LATEST` that is never read. `LATEST` is the commit
//! marker: without it the log is empty regardless of `EARLIEST`.

use crate::error::StorageError;
use crate::fs_util::{read_if_exists, remove_dir_all_if_exists, remove_file_if_exists, write_atomic};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

const EARLIEST_FILE: &str = "EARLIEST";
const LATEST_FILE: &str = "LATEST";

/// Position of an entry within a [`DiskJournal`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JournalOrdinal(pub u64);

impl JournalOrdinal {
    pub const FIRST: JournalOrdinal = JournalOrdinal(0);

    pub fn next(self) -> Option<JournalOrdinal> {
        self.0.checked_add(1).map(JournalOrdinal)
    }
}

impl fmt::Display for JournalOrdinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-disk form of one entry
#[derive(Serialize, Deserialize)]
struct StoredEntry<E> {
    ordinal: JournalOrdinal,
    /// CRC32 of the serialized entry
    checksum: u32,
    entry: E,
}

fn checksum<E: Serialize>(entry: &E) -> Result<u32, StorageError> {
    let json = serde_json::to_vec(entry)?;
    Ok(crc32fast::hash(&json))
}

/// Append-only ordinal log backed by a directory
#[derive(Debug)]
pub struct DiskJournal<E> {
    dir: PathBuf,
    sync_writes: bool,
    _entry: PhantomData<fn() -> E>,
}

impl<E: Serialize + DeserializeOwned> DiskJournal<E> {
    /// Open the log rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>, sync_writes: bool) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            sync_writes,
            _entry: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, ordinal: JournalOrdinal) -> PathBuf {
        self.dir.join(ordinal.to_string())
    }

    fn read_marker(&self, name: &'static str) -> Result<JournalOrdinal, StorageError> {
        let data = read_if_exists(&self.dir.join(name))?.ok_or(StorageError::NotFound {
            kind: "journal marker",
            id: name.to_string(),
        })?;
        let text = String::from_utf8_lossy(&data);
        text.trim()
            .parse::<u64>()
            .map(JournalOrdinal)
            .map_err(|e| StorageError::Integrity(format!("bad {} marker {:?}: {}", name, text, e)))
    }

    fn write_marker(&self, name: &str, ordinal: JournalOrdinal) -> Result<(), StorageError> {
        write_atomic(
            &self.dir.join(name),
            ordinal.to_string().as_bytes(),
            self.sync_writes,
        )?;
        Ok(())
    }

    /// Ordinal of the first committed entry; `NotFound` if the log is empty
    pub fn read_earliest_ordinal(&self) -> Result<JournalOrdinal, StorageError> {
        // LATEST commits the range; EARLIEST alone is a torn first append.
        self.read_marker(LATEST_FILE)?;
        self.read_marker(EARLIEST_FILE)
    }

    /// Ordinal of the last committed entry; `NotFound` if the log is empty
    pub fn read_latest_ordinal(&self) -> Result<JournalOrdinal, StorageError> {
        self.read_marker(LATEST_FILE)
    }

    fn bounds(&self) -> Result<Option<(JournalOrdinal, JournalOrdinal)>, StorageError> {
        let latest = match self.read_latest_ordinal() {
            Ok(latest) => latest,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let earliest = self.read_marker(EARLIEST_FILE)?;
        if earliest > latest {
            return Err(StorageError::Integrity(format!(
                "earliest ordinal {} is past latest {}",
                earliest, latest
            )));
        }
        Ok(Some((earliest, latest)))
    }

    /// Number of committed entries
    pub fn length(&self) -> Result<u64, StorageError> {
        Ok(self
            .bounds()?
            .map(|(earliest, latest)| latest.0 - earliest.0 + 1)
            .unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.bounds()?.is_none())
    }

    /// Read the entry at `ordinal`, verifying its checksum
    pub fn read(&self, ordinal: JournalOrdinal) -> Result<E, StorageError> {
        let data = read_if_exists(&self.entry_path(ordinal))?.ok_or(StorageError::NotFound {
            kind: "journal entry",
            id: ordinal.to_string(),
        })?;
        let stored: StoredEntry<E> = serde_json::from_slice(&data)?;
        if stored.ordinal != ordinal {
            return Err(StorageError::Integrity(format!(
                "entry file {} holds ordinal {}",
                ordinal, stored.ordinal
            )));
        }
        if checksum(&stored.entry)? != stored.checksum {
            return Err(StorageError::Integrity(format!(
                "checksum mismatch in entry {}",
                ordinal
            )));
        }
        Ok(stored.entry)
    }

    /// Overwrite the entry file at `ordinal` without touching the markers
    pub fn write_entry(&self, ordinal: JournalOrdinal, entry: &E) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let stored = StoredEntry {
            ordinal,
            checksum: checksum(entry)?,
            entry,
        };
        let data = serde_json::to_vec(&stored)?;
        write_atomic(&self.entry_path(ordinal), &data, self.sync_writes)?;
        Ok(())
    }

    /// The ordinal the next [`append`](Self::append) would use
    pub fn next_ordinal(&self) -> Result<Option<JournalOrdinal>, StorageError> {
        match self.bounds()? {
            Some((_, latest)) => latest.next().map(Some).ok_or_else(|| {
                StorageError::Integrity(format!("ordinal overflow after {}", latest))
            }),
            None => Ok(None),
        }
    }

    /// Append at the next ordinal (or [`JournalOrdinal::FIRST`] when empty)
    pub fn append(&self, entry: &E) -> Result<JournalOrdinal, StorageError> {
        let ordinal = self.next_ordinal()?.unwrap_or(JournalOrdinal::FIRST);
        self.append_at(ordinal, entry)?;
        Ok(ordinal)
    }

    /// Append at `ordinal`, which must follow the latest entry
    ///
    /// An empty log accepts any starting ordinal.
    pub fn append_at(&self, ordinal: JournalOrdinal, entry: &E) -> Result<(), StorageError> {
        let next = self.next_ordinal()?;
        if let Some(expected) = next {
            if ordinal != expected {
                return Err(StorageError::OutOfOrder {
                    expected,
                    actual: ordinal,
                });
            }
        }
        self.write_entry(ordinal, entry)?;
        if next.is_none() {
            self.write_marker(EARLIEST_FILE, ordinal)?;
        }
        self.write_marker(LATEST_FILE, ordinal)
    }

    /// Drop the earliest entry; returns whether the log is now empty
    pub fn remove_earliest(&self) -> Result<bool, StorageError> {
        let (earliest, latest) = self.bounds()?.ok_or(StorageError::NotFound {
            kind: "journal marker",
            id: EARLIEST_FILE.to_string(),
        })?;
        let now_empty = earliest == latest;
        if now_empty {
            remove_file_if_exists(&self.dir.join(LATEST_FILE))?;
            remove_file_if_exists(&self.dir.join(EARLIEST_FILE))?;
        } else {
            let next = earliest.next().ok_or_else(|| {
                StorageError::Integrity(format!("ordinal overflow after {}", earliest))
            })?;
            self.write_marker(EARLIEST_FILE, next)?;
        }
        remove_file_if_exists(&self.entry_path(earliest))?;
        Ok(now_empty)
    }

    /// Drop every entry at or after `ordinal`
    pub fn truncate_from(&self, ordinal: JournalOrdinal) -> Result<(), StorageError> {
        let Some((earliest, latest)) = self.bounds()? else {
            return Ok(());
        };
        if ordinal > latest {
            return Ok(());
        }
        if ordinal <= earliest {
            return self.clear();
        }
        self.write_marker(LATEST_FILE, JournalOrdinal(ordinal.0 - 1))?;
        for n in ordinal.0..=latest.0 {
            remove_file_if_exists(&self.entry_path(JournalOrdinal(n)))?;
        }
        Ok(())
    }

    /// Delete the whole log, markers included
    pub fn clear(&self) -> Result<(), StorageError> {
        remove_dir_all_if_exists(&self.dir)?;
        Ok(())
    }

    /// Rename the backing directory to `new_dir`; returns the old location
    pub fn move_to(&mut self, new_dir: impl Into<PathBuf>) -> Result<PathBuf, StorageError> {
        let new_dir = new_dir.into();
        fs::rename(&self.dir, &new_dir)?;
        Ok(std::mem::replace(&mut self.dir, new_dir))
    }
}

#[cfg(test)]
#[path = "disk_journal_tests.rs"]
mod tests;
