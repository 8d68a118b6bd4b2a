//! Branch conversion specs
//!
//! Verify that conversion keeps count, order and chaining.

use crate::prelude::*;

#[test]
fn converting_ten_merged_entries_keeps_count_and_order() {
    let device = Device::new(MetadataVer::V3);
    let mut j = device.open();
    let root = Some(BlobId::fake(1));
    device.put_chain(&mut j, 10, root, 10);
    let bid = BranchId::fake(42);

    j.convert_to_branch(&device.signer, bid).unwrap();

    let mds = j.get_range(bid, Revision(1), Revision(100)).unwrap();
    similar_asserts::assert_eq!(revisions(&mds), (10..20).collect::<Vec<_>>());
    assert!(mds
        .iter()
        .all(|md| md.md.merge_status() == MergeStatus::Unmerged && md.md.branch_id() == bid));
    for pair in mds.windows(2) {
        pair[0].md.check_valid_successor(pair[0].id, &pair[1].md).unwrap();
    }
    assert_chained(&mds, root);
}

#[test]
fn resolution_replaces_the_branch() {
    let device = Device::new(MetadataVer::V2);
    let mut j = device.open();
    device.put_chain(&mut j, 10, None, 5);
    let bid = BranchId::fake(9);
    j.convert_to_branch(&device.signer, bid).unwrap();

    let (md, extra) = device.md(10, None);
    let resolution = j
        .resolve_and_clear(&device.signer, bid, md, extra.as_ref())
        .unwrap();

    similar_asserts::assert_eq!(
        resolution.superseded,
        (10..15).map(Revision).collect::<Vec<_>>()
    );
    similar_asserts::assert_eq!(j.branch_id(), BranchId::NULL);
    similar_asserts::assert_eq!(j.length().unwrap(), 1);
    similar_asserts::assert_eq!(j.get_head(BranchId::NULL).unwrap().unwrap().id, resolution.id);
}
