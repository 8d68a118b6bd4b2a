// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed metadata blob store
//!
//! Layout: `<dir>/<id[..4]>/<id[4..]>/{data,info.json}`. `data` is written
//! last and marks the blob as present.

use crate::error::StorageError;
use crate::fs_util::{read_if_exists, remove_dir_all_if_exists, remove_dir_if_empty, write_atomic};
use chrono::{DateTime, Utc};
use mdj_core::{codec, BlobId, Crypto, MetadataVer, RootMetadata};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DATA_FILE: &str = "data";
const INFO_FILE: &str = "info.json";

/// Sidecar recorded next to each blob
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MdInfo {
    timestamp: DateTime<Utc>,
    version: MetadataVer,
}

/// A blob read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMd {
    pub md: RootMetadata,
    pub timestamp: DateTime<Utc>,
    pub version: MetadataVer,
}

#[derive(Debug, Clone)]
pub struct MdStore<C: Crypto> {
    dir: PathBuf,
    crypto: C,
    sync_writes: bool,
    max_version: MetadataVer,
}

impl<C: Crypto> MdStore<C> {
    pub fn new(dir: impl Into<PathBuf>, crypto: C, sync_writes: bool, max_version: MetadataVer) -> Self {
        Self {
            dir: dir.into(),
            crypto,
            sync_writes,
            max_version,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_dir(&self, id: BlobId) -> PathBuf {
        let s = id.to_string();
        let (splay, rest) = s.split_at(4);
        self.dir.join(splay).join(rest)
    }

    /// Store `md`; a blob already present under its ID is left untouched
    pub fn put(&self, md: &RootMetadata, timestamp: DateTime<Utc>) -> Result<BlobId, StorageError> {
        let id = self.crypto.make_blob_id(md)?;
        let blob_dir = self.blob_dir(id);
        if blob_dir.join(DATA_FILE).exists() {
            tracing::debug!(%id, "metadata blob already stored");
            return Ok(id);
        }

        fs::create_dir_all(&blob_dir)?;
        let info = MdInfo {
            timestamp,
            version: md.version(),
        };
        write_atomic(
            &blob_dir.join(INFO_FILE),
            &serde_json::to_vec(&info)?,
            self.sync_writes,
        )?;
        write_atomic(&blob_dir.join(DATA_FILE), &codec::encode(md)?, self.sync_writes)?;
        tracing::debug!(%id, revision = %md.revision(), "stored metadata blob");
        Ok(id)
    }

    /// Read the blob stored under `id`, re-verifying its hash
    pub fn get(&self, id: BlobId) -> Result<StoredMd, StorageError> {
        let blob_dir = self.blob_dir(id);
        let not_found = || StorageError::NotFound {
            kind: "metadata",
            id: id.to_string(),
        };
        let data = read_if_exists(&blob_dir.join(DATA_FILE))?.ok_or_else(not_found)?;
        let info_data = read_if_exists(&blob_dir.join(INFO_FILE))?.ok_or_else(not_found)?;
        let info: MdInfo = serde_json::from_slice(&info_data)?;
        if info.version > self.max_version {
            return Err(StorageError::UnsupportedVersion {
                found: info.version,
                supported: self.max_version,
            });
        }

        let md: RootMetadata = codec::decode(&data)?;
        if md.version() != info.version {
            return Err(StorageError::Integrity(format!(
                "blob {} decoded as {}, sidecar says {}",
                id,
                md.version(),
                info.version
            )));
        }
        let actual = self.crypto.make_blob_id(&md)?;
        if actual != id {
            return Err(StorageError::Integrity(format!(
                "blob stored as {} hashes to {}",
                id, actual
            )));
        }
        Ok(StoredMd {
            md,
            timestamp: info.timestamp,
            version: info.version,
        })
    }

    /// Delete the blob and prune its splay directory if now empty
    pub fn remove(&self, id: BlobId) -> Result<(), StorageError> {
        let blob_dir = self.blob_dir(id);
        remove_dir_all_if_exists(&blob_dir)?;
        if let Some(parent) = blob_dir.parent() {
            remove_dir_if_empty(parent)?;
        }
        tracing::debug!(%id, "removed metadata blob");
        Ok(())
    }

    /// Delete every stored blob
    pub fn clear(&self) -> Result<(), StorageError> {
        remove_dir_all_if_exists(&self.dir)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "md_store_tests.rs"]
mod tests;
