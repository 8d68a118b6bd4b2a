// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! mdj-journal: client-side metadata journal
//!
//! Revisions written locally are journaled per folder and device, then
//! flushed to the metadata server in order. When another writer gets there
//! first, the journal moves onto a branch until it is resolved.

mod branch;
pub mod config;
mod error;
mod flush;
mod md_journal;
mod recovery;
pub mod server;
pub mod traced;

#[cfg(test)]
mod test_helpers;

pub use branch::{Resolution, RewrittenRevision};
pub use config::{state_root, ConfigError, JournalConfig, JournalPaths};
pub use error::JournalError;
pub use flush::{flush_one, FlushEntry, FlushError, FlushOutcome};
pub use md_journal::{ImmutableMetadata, MdJournal};
pub use server::{MdServer, ServerError};
pub use traced::TracedMdServer;

#[cfg(any(test, feature = "test-support"))]
pub use server::{FakeMdServer, ServerCall};
