// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! On-disk storage for the metadata journal
//!
//! - [`DiskJournal`]: generic append-only log of ordinal-numbered entry files
//! - [`RevisionJournal`]: the log indexed by metadata revision
//! - [`MdStore`]: content-addressed metadata blobs
//! - [`KeyBundleStore`]: content-addressed key bundles

mod disk_journal;
mod error;
mod fs_util;
mod key_bundle_store;
mod md_store;
mod revision_journal;

pub use disk_journal::{DiskJournal, JournalOrdinal};
pub use error::StorageError;
pub use key_bundle_store::KeyBundleStore;
pub use md_store::{MdStore, StoredMd};
pub use revision_journal::{JournalEntry, RevisionJournal};
