// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery for interrupted index rewrites
//!
//! Index rewrites (branch conversion, resolution) build the new index under a
//! temporary directory `<journal_dir_name>.<random>/new`, move the live index
//! to `.../old`, then move the new one into place. A crash between the two
//! moves leaves no live index; the old one is moved back.

use crate::config::JournalConfig;
use crate::error::JournalError;
use std::fs;
use std::path::Path;

pub(crate) const NEW_INDEX_DIR: &str = "new";
pub(crate) const OLD_INDEX_DIR: &str = "old";

/// Restore or discard leftovers of interrupted rewrites under `dir`
pub(crate) fn recover(dir: &Path, config: &JournalConfig) -> Result<(), JournalError> {
    let live = dir.join(&config.journal_dir_name);
    let prefix = config.temp_dir_prefix();

    for dent in fs::read_dir(dir)? {
        let dent = dent?;
        let name = dent.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(&prefix) || !dent.file_type()?.is_dir() {
            continue;
        }

        let tmp = dent.path();
        let old = tmp.join(OLD_INDEX_DIR);
        if !live.exists() && old.is_dir() {
            tracing::warn!(from = %old.display(), "restoring index from interrupted rewrite");
            fs::rename(&old, &live)?;
        }
        tracing::debug!(path = %tmp.display(), "removing leftover rewrite directory");
        fs::remove_dir_all(&tmp)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
