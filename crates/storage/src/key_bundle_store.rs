// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed key bundle store

use crate::error::StorageError;
use crate::fs_util::{read_if_exists, remove_dir_all_if_exists, write_atomic};
use mdj_core::{codec, Crypto, KeyBundleId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Stores one kind of key bundle under `<dir>/<id[..4]>/<id[4..]>`
#[derive(Debug, Clone)]
pub struct KeyBundleStore<T, C: Crypto> {
    dir: PathBuf,
    crypto: C,
    sync_writes: bool,
    _bundle: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned, C: Crypto> KeyBundleStore<T, C> {
    pub fn new(dir: impl Into<PathBuf>, crypto: C, sync_writes: bool) -> Self {
        Self {
            dir: dir.into(),
            crypto,
            sync_writes,
            _bundle: PhantomData,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, id: KeyBundleId) -> PathBuf {
        let s = id.to_string();
        let (splay, rest) = s.split_at(4);
        self.dir.join(splay).join(rest)
    }

    fn check_id(&self, id: KeyBundleId, bundle: &T) -> Result<(), StorageError> {
        let actual = self.crypto.make_key_bundle_id(bundle)?;
        if actual != id {
            return Err(StorageError::Integrity(format!(
                "key bundle {} hashes to {}",
                id, actual
            )));
        }
        Ok(())
    }

    /// Store `bundle` under `id` after checking that it hashes to `id`
    ///
    /// Returns whether the bundle was newly written.
    pub fn put(&self, id: KeyBundleId, bundle: &T) -> Result<bool, StorageError> {
        self.check_id(id, bundle)?;
        let path = self.path(id);
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomic(&path, &codec::encode(bundle)?, self.sync_writes)?;
        tracing::debug!(%id, "stored key bundle");
        Ok(true)
    }

    pub fn get(&self, id: KeyBundleId) -> Result<T, StorageError> {
        let data = read_if_exists(&self.path(id))?.ok_or(StorageError::NotFound {
            kind: "key bundle",
            id: id.to_string(),
        })?;
        let bundle: T = codec::decode(&data)?;
        self.check_id(id, &bundle)?;
        Ok(bundle)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        remove_dir_all_if_exists(&self.dir)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "key_bundle_store_tests.rs"]
mod tests;
