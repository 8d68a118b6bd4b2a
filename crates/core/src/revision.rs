// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metadata revision numbers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically increasing number identifying one metadata update
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl Revision {
    /// Sentinel below the valid range
    pub const UNINITIALIZED: Revision = Revision(0);
    /// First revision of every folder
    pub const INITIAL: Revision = Revision(1);

    pub fn is_valid(self) -> bool {
        self >= Self::INITIAL
    }

    /// The following revision, or `None` on overflow
    pub fn next(self) -> Option<Revision> {
        self.0.checked_add(1).map(Revision)
    }

    /// Revision `n` steps after this one, or `None` on overflow
    pub fn checked_add(self, n: u64) -> Option<Revision> {
        self.0.checked_add(n).map(Revision)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a revision belongs to the canonical history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeStatus {
    Merged,
    Unmerged,
}

impl fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStatus::Merged => write!(f, "merged"),
            MergeStatus::Unmerged => write!(f, "unmerged"),
        }
    }
}

#[cfg(test)]
#[path = "revision_tests.rs"]
mod tests;
