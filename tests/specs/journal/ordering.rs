//! Put/read ordering specs
//!
//! Verify that journaled revisions read back in order and chained.

use crate::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn puts_read_back_in_revision_order(
        first in 1u64..1000,
        count in 1u64..12,
        v3 in any::<bool>(),
    ) {
        let ver = if v3 { MetadataVer::V3 } else { MetadataVer::V2 };
        let device = Device::new(ver);
        let mut j = device.open();
        let root = Some(BlobId::fake(1));
        let ids = device.put_chain(&mut j, first, root, count);

        let mds = j.get_range(BranchId::NULL, Revision(1), Revision(first + count + 5)).unwrap();
        prop_assert_eq!(revisions(&mds), (first..first + count).collect::<Vec<_>>());
        prop_assert_eq!(mds.iter().map(|md| md.id).collect::<Vec<_>>(), ids);
        prop_assert_eq!(j.length().unwrap(), count);
        assert_chained(&mds, root);
    }
}

#[test]
fn replaying_a_put_replaces_the_head() {
    let device = Device::new(MetadataVer::V2);
    let mut j = device.open();
    let ids = device.put_chain(&mut j, 1, None, 3);

    // Same content, signed again after an ambiguous failure
    let (md, extra) = device.md(3, Some(ids[1]));
    let id = j.put(&device.signer, md, extra.as_ref(), false).unwrap();

    similar_asserts::assert_eq!(id, ids[2]);
    similar_asserts::assert_eq!(j.length().unwrap(), 3);
    similar_asserts::assert_eq!(j.get_head(BranchId::NULL).unwrap().unwrap().id, ids[2]);
}

#[test]
fn revisions_survive_reopening() {
    let device = Device::new(MetadataVer::V3);
    let ids = {
        let mut j = device.open();
        device.put_chain(&mut j, 5, None, 4)
    };

    let j = device.open();
    let mds = j.get_range(BranchId::NULL, Revision(1), Revision(100)).unwrap();
    similar_asserts::assert_eq!(mds.iter().map(|md| md.id).collect::<Vec<_>>(), ids);
    assert_chained(&mds, None);
}

#[test]
fn a_second_process_cannot_open_the_journal() {
    let device = Device::new(MetadataVer::V3);
    let _j = device.open();

    let second = MdJournal::open(
        device.config(),
        device.dir(),
        device.uid.clone(),
        device.signer.verifying_key(),
        device.tlf.clone(),
        FakeCrypto,
        device.clock.clone(),
    );
    assert!(matches!(second, Err(JournalError::Locked { .. })));
}
