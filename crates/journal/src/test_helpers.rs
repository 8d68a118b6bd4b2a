// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for journal tests

use crate::{ImmutableMetadata, JournalConfig, MdJournal};
use mdj_core::fake::{make_key_bundles_for_test, make_md_for_test};
use mdj_core::{
    BlobId, BranchId, Crypto, FakeClock, FakeCrypto, FakeSigner, KeyBundles, MergeStatus,
    MetadataVer, Revision, RootMetadata, Signer, TlfId, UserId,
};
use std::path::Path;
use tempfile::TempDir;

pub(crate) type TestJournal = MdJournal<FakeCrypto, FakeClock>;

pub(crate) struct Fixture {
    pub dir: TempDir,
    pub ver: MetadataVer,
    pub uid: UserId,
    pub tlf: TlfId,
    pub signer: FakeSigner,
    pub clock: FakeClock,
}

impl Fixture {
    pub fn new(ver: MetadataVer) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            ver,
            uid: UserId::from("alice"),
            tlf: TlfId::from("tlf-1"),
            signer: FakeSigner::new("alice device"),
            clock: FakeClock::new(),
        }
    }

    pub fn config(&self) -> JournalConfig {
        JournalConfig {
            sync_writes: false,
            ..JournalConfig::default()
        }
    }

    pub fn journal_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn open(&self) -> TestJournal {
        MdJournal::open(
            self.config(),
            self.journal_dir(),
            self.uid.clone(),
            self.signer.verifying_key(),
            self.tlf.clone(),
            FakeCrypto,
            self.clock.clone(),
        )
        .unwrap()
    }

    /// A merged revision, with key bundles attached for V3
    pub fn make_md(&self, revision: u64, prev_root: Option<BlobId>) -> (RootMetadata, Option<KeyBundles>) {
        let mut md = make_md_for_test(
            self.ver,
            &self.tlf,
            Revision(revision),
            &self.uid,
            &self.signer,
            prev_root,
        );
        let extra = match self.ver {
            MetadataVer::V2 => None,
            MetadataVer::V3 => {
                let bundles = make_key_bundles_for_test(&self.uid);
                md.attach_key_bundles(&FakeCrypto, &bundles).unwrap();
                Some(bundles)
            }
        };
        (md, extra)
    }

    /// Put `count` chained merged revisions; returns their IDs
    pub fn put_range(
        &self,
        j: &mut TestJournal,
        first: u64,
        prev_root: Option<BlobId>,
        count: u64,
        is_local_squash: bool,
    ) -> Vec<BlobId> {
        let mut prev_root = prev_root;
        let mut ids = Vec::new();
        for revision in first..first + count {
            let (md, extra) = self.make_md(revision, prev_root);
            let id = j.put(&self.signer, md, extra.as_ref(), is_local_squash).unwrap();
            prev_root = Some(id);
            ids.push(id);
        }
        ids
    }
}

/// Flush every entry, checking the stores are wiped afterwards
pub(crate) fn flush_all(j: &mut TestJournal, signer: &dyn Signer) -> Vec<BlobId> {
    let end = j.end().unwrap();
    let mut flushed = Vec::new();
    while let Some(entry) = j.get_next_entry_to_flush(end, signer).unwrap() {
        j.remove_flushed_entry(entry.id, &entry.rmds).unwrap();
        flushed.push(entry.id);
    }
    let config = JournalConfig::default();
    for name in [
        config.journal_dir_name,
        config.mds_dir_name,
        config.writer_bundles_dir_name,
        config.reader_bundles_dir_name,
    ] {
        assert!(!j.dir().join(&name).exists(), "{} still exists", name);
    }
    flushed
}

pub(crate) fn list_dir(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .unwrap()
        .map(|dent| dent.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub(crate) fn journal_names(ver: MetadataVer) -> Vec<String> {
    let names: &[&str] = match ver {
        MetadataVer::V2 => &["journal.lock", "md_journal", "mds"],
        MetadataVer::V3 => &["journal.lock", "md_journal", "mds", "rkbv3", "wkbv3"],
    };
    names.iter().map(|n| n.to_string()).collect()
}

/// Check revisions, chaining, status and signatures of a contiguous range
pub(crate) fn check_range(
    mds: &[ImmutableMetadata],
    first_revision: u64,
    first_prev_root: Option<BlobId>,
    status: MergeStatus,
    bid: BranchId,
) {
    let mut prev_root = first_prev_root;
    for (i, md) in mds.iter().enumerate() {
        assert_eq!(md.revision(), Revision(first_revision + i as u64));
        assert_eq!(md.md.prev_root(), prev_root, "prev root of revision {}", md.revision());
        assert_eq!(md.md.merge_status(), status);
        assert_eq!(md.md.branch_id(), bid);
        assert_eq!(FakeCrypto.make_blob_id(&md.md).unwrap(), md.id);
        md.md.is_valid_and_signed(&FakeCrypto, md.extra.as_ref()).unwrap();
        prev_root = Some(md.id);
    }
}
