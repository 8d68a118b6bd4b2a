//! Flush conflict specs
//!
//! Verify that a revision conflict on a merged revision moves local
//! work onto a branch that later puts follow.

use crate::prelude::*;
use mdj_core::{Clock, RootMetadataSigned};

/// Another device takes revision `revision` on the server first
fn rival_takes(server: &FakeMdServer, device: &Device, revision: u64, prev_root: BlobId) {
    let bob = FakeSigner::new("bob phone");
    let mut md = make_md_for_test(
        device.ver,
        &device.tlf,
        Revision(revision),
        &UserId::from("bob"),
        &bob,
        Some(prev_root),
    );
    md.sign_writer_metadata_internally(&bob).unwrap();
    let rmds = RootMetadataSigned::sign(md, &bob, device.clock.now()).unwrap();
    mdj_journal::MdServer::put(server, &rmds, None).unwrap();
}

#[test]
fn conflicting_flush_moves_later_work_onto_a_branch() {
    let device = Device::new(MetadataVer::V3);
    let journal = Mutex::new(device.open());
    let server = FakeMdServer::new();

    // Revision 10 reaches the server
    let head = device.put_chain(&mut journal.lock().unwrap(), 10, None, 1)[0];
    let end = journal.lock().unwrap().end().unwrap();
    flush_one(&journal, &device.signer, &server, end).unwrap();

    // Local revision 11 races another writer's revision 11
    let (md, extra) = device.md(11, Some(head));
    journal
        .lock()
        .unwrap()
        .put(&device.signer, md, extra.as_ref(), false)
        .unwrap();
    rival_takes(&server, &device, 11, head);

    let end = journal.lock().unwrap().end().unwrap();
    let outcome = flush_one(&journal, &device.signer, &server, end).unwrap();
    let FlushOutcome::ConvertedToBranch { branch_id, .. } = outcome else {
        panic!("expected a branch, got {:?}", outcome);
    };
    assert!(!branch_id.is_null());

    // A merged put is now a conflict; resubmitting as unmerged succeeds
    let mut j = journal.lock().unwrap();
    let (md, extra) = device.md(12, None);
    let err = j
        .put(&device.signer, md.clone(), extra.as_ref(), false)
        .unwrap_err();
    assert!(err.is_conflict(), "{err}");
    let mut md = md;
    md.set_unmerged();
    j.put(&device.signer, md, extra.as_ref(), false).unwrap();

    let head = j.get_head(branch_id).unwrap().unwrap();
    similar_asserts::assert_eq!(head.md.branch_id(), branch_id);
    let branch = j.get_range(branch_id, Revision(11), Revision(12)).unwrap();
    similar_asserts::assert_eq!(revisions(&branch), vec![11, 12]);
    assert!(branch.iter().all(|md| md.md.branch_id() == branch_id));
    assert_chained(&branch[1..], Some(branch[0].id));
}
