// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal configuration and on-disk locations

use mdj_core::{hex_encode, MetadataVer, TlfId, UserId, VerifyingKey};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("could not determine a state directory")]
    NoStateDir,
}

/// Tunables for one journal
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JournalConfig {
    /// Newest metadata version this client writes and reads
    pub metadata_version: MetadataVer,
    /// fsync entry, marker and blob files as they are written
    pub sync_writes: bool,
    pub journal_dir_name: String,
    pub mds_dir_name: String,
    pub writer_bundles_dir_name: String,
    pub reader_bundles_dir_name: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            metadata_version: MetadataVer::LATEST,
            sync_writes: true,
            journal_dir_name: "md_journal".to_string(),
            mds_dir_name: "mds".to_string(),
            writer_bundles_dir_name: "wkbv3".to_string(),
            reader_bundles_dir_name: "rkbv3".to_string(),
        }
    }
}

impl JournalConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Prefix of the temporary directories used while rewriting the index
    pub(crate) fn temp_dir_prefix(&self) -> String {
        format!("{}.", self.journal_dir_name)
    }
}

/// Directory holding the journal of one folder on one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalPaths {
    pub dir: PathBuf,
}

impl JournalPaths {
    /// `<state_root>/tlfs/<tlf>/<uid>-<device hash>`
    pub fn for_device(state_root: &Path, uid: &UserId, key: &VerifyingKey, tlf: &TlfId) -> Self {
        let device = format!("{}-{}", uid, device_hash(key));
        Self {
            dir: state_root.join("tlfs").join(&tlf.0).join(device),
        }
    }
}

/// First 16 hex chars of the SHA-256 of the device's verifying key
fn device_hash(key: &VerifyingKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.0.as_bytes());
    let result = hasher.finalize();
    hex_encode(&result[..8])
}

/// Root directory for all journals on this machine
pub fn state_root() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("MDJ_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("mdj"));
    }
    if let Some(dir) = dirs::state_dir() {
        return Ok(dir.join("mdj"));
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/mdj"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
