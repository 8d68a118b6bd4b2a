//! Index swap crash specs
//!
//! Verify that an interrupted index rewrite is all-or-nothing.

use crate::prelude::*;
use std::fs;
use std::path::Path;

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for dent in fs::read_dir(from).unwrap() {
        let dent = dent.unwrap();
        fs::copy(dent.path(), to.join(dent.file_name())).unwrap();
    }
}

fn assert_original_chain(device: &Device, ids: &[BlobId]) {
    let j = device.open();
    let mds = j.get_range(BranchId::NULL, Revision(1), Revision(100)).unwrap();
    similar_asserts::assert_eq!(revisions(&mds), (1..=ids.len() as u64).collect::<Vec<_>>());
    similar_asserts::assert_eq!(mds.iter().map(|md| md.id).collect::<Vec<_>>(), ids.to_vec());
    assert_chained(&mds, None);
    similar_asserts::assert_eq!(j.branch_id(), BranchId::NULL);
}

#[test]
fn crash_before_any_rename_keeps_original_index() {
    let device = Device::new(MetadataVer::V3);
    let ids = {
        let mut j = device.open();
        device.put_chain(&mut j, 1, None, 5)
    };

    // A fully written replacement that never got swapped in
    let tmp = device.dir().join("md_journal.interrupted");
    copy_dir(&device.dir().join("md_journal"), &tmp.join("new"));

    assert_original_chain(&device, &ids);
    assert!(!tmp.exists());
}

#[test]
fn crash_between_renames_restores_original_index() {
    let device = Device::new(MetadataVer::V2);
    let ids = {
        let mut j = device.open();
        device.put_chain(&mut j, 1, None, 5)
    };

    let tmp = device.dir().join("md_journal.interrupted");
    copy_dir(&device.dir().join("md_journal"), &tmp.join("new"));
    fs::rename(device.dir().join("md_journal"), tmp.join("old")).unwrap();

    assert_original_chain(&device, &ids);
    assert!(!tmp.exists());
}
