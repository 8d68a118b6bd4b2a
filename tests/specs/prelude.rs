//! Shared fixtures for journal specs

pub use mdj_core::fake::{make_key_bundles_for_test, make_md_for_test};
pub use mdj_core::{
    BlobId, BranchId, FakeClock, FakeCrypto, FakeSigner, KeyBundles, MergeStatus, MetadataVer,
    Revision, RootMetadata, Signer, TlfId, UserId,
};
pub use mdj_journal::{
    flush_one, FakeMdServer, FlushOutcome, ImmutableMetadata, JournalConfig, JournalError,
    MdJournal,
};
pub use std::sync::Mutex;

use std::path::Path;
use tempfile::TempDir;

pub type Journal = MdJournal<FakeCrypto, FakeClock>;

/// One user's device with its own journal directory
pub struct Device {
    dir: TempDir,
    pub ver: MetadataVer,
    pub uid: UserId,
    pub tlf: TlfId,
    pub signer: FakeSigner,
    pub clock: FakeClock,
}

impl Device {
    pub fn new(ver: MetadataVer) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            ver,
            uid: UserId::from("alice"),
            tlf: TlfId::from("shared-folder"),
            signer: FakeSigner::new("alice laptop"),
            clock: FakeClock::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> JournalConfig {
        JournalConfig {
            sync_writes: false,
            ..JournalConfig::default()
        }
    }

    pub fn open(&self) -> Journal {
        MdJournal::open(
            self.config(),
            self.dir(),
            self.uid.clone(),
            self.signer.verifying_key(),
            self.tlf.clone(),
            FakeCrypto,
            self.clock.clone(),
        )
        .unwrap()
    }

    /// A merged revision, with key bundles attached for V3
    pub fn md(&self, revision: u64, prev_root: Option<BlobId>) -> (RootMetadata, Option<KeyBundles>) {
        let mut md = make_md_for_test(
            self.ver,
            &self.tlf,
            Revision(revision),
            &self.uid,
            &self.signer,
            prev_root,
        );
        let extra = if self.ver == MetadataVer::V3 {
            let bundles = make_key_bundles_for_test(&self.uid);
            md.attach_key_bundles(&FakeCrypto, &bundles).unwrap();
            Some(bundles)
        } else {
            None
        };
        (md, extra)
    }

    /// Put `count` chained merged revisions starting at `first`
    pub fn put_chain(
        &self,
        j: &mut Journal,
        first: u64,
        prev_root: Option<BlobId>,
        count: u64,
    ) -> Vec<BlobId> {
        let mut prev_root = prev_root;
        (first..first + count)
            .map(|revision| {
                let (md, extra) = self.md(revision, prev_root);
                let id = j.put(&self.signer, md, extra.as_ref(), false).unwrap();
                prev_root = Some(id);
                id
            })
            .collect()
    }
}

pub fn revisions(mds: &[ImmutableMetadata]) -> Vec<u64> {
    mds.iter().map(|md| md.revision().0).collect()
}

/// Every entry links to the one before it
pub fn assert_chained(mds: &[ImmutableMetadata], first_prev_root: Option<BlobId>) {
    let mut expected = first_prev_root;
    for md in mds {
        similar_asserts::assert_eq!(md.md.prev_root(), expected);
        expected = Some(md.id);
    }
}
