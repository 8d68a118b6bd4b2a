//! Flush drain specs
//!
//! Verify that flushing sends entries earliest first and empties cleanly.

use crate::prelude::*;

#[test]
fn flushing_drains_in_order_and_remembers_last_root() {
    let device = Device::new(MetadataVer::V3);
    let journal = Mutex::new(device.open());
    let ids = device.put_chain(&mut journal.lock().unwrap(), 1, None, 6);
    let server = FakeMdServer::new();
    let end = journal.lock().unwrap().end().unwrap();

    let mut flushed = Vec::new();
    loop {
        match flush_one(&journal, &device.signer, &server, end).unwrap() {
            FlushOutcome::Flushed { revision, id } => flushed.push((revision.0, id)),
            FlushOutcome::Empty => break,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    similar_asserts::assert_eq!(
        flushed,
        (1..=6).zip(ids.iter().copied()).collect::<Vec<_>>()
    );
    let j = journal.lock().unwrap();
    similar_asserts::assert_eq!(j.length().unwrap(), 0);
    assert!(j.get_head(BranchId::NULL).unwrap().is_none());
    similar_asserts::assert_eq!(j.last_flushed_id(), ids.last().copied());
    similar_asserts::assert_eq!(server.history(&device.tlf, BranchId::NULL).len(), 6);
}

#[test]
fn flushing_stops_at_the_limit() {
    let device = Device::new(MetadataVer::V2);
    let journal = Mutex::new(device.open());
    device.put_chain(&mut journal.lock().unwrap(), 1, None, 4);
    let server = FakeMdServer::new();

    while flush_one(&journal, &device.signer, &server, Revision(3)).unwrap() != FlushOutcome::Empty {}

    let j = journal.lock().unwrap();
    similar_asserts::assert_eq!(j.length().unwrap(), 2);
    similar_asserts::assert_eq!(j.read_earliest_revision().unwrap(), Revision(3));
}

#[test]
fn puts_after_a_full_flush_chain_to_the_flushed_root() {
    let device = Device::new(MetadataVer::V3);
    let journal = Mutex::new(device.open());
    let ids = device.put_chain(&mut journal.lock().unwrap(), 1, None, 2);
    let server = FakeMdServer::new();
    let end = journal.lock().unwrap().end().unwrap();
    while flush_one(&journal, &device.signer, &server, end).unwrap() != FlushOutcome::Empty {}

    let mut j = journal.lock().unwrap();
    let (md, extra) = device.md(3, j.last_flushed_id());
    j.put(&device.signer, md, extra.as_ref(), false).unwrap();
    drop(j);

    let end = journal.lock().unwrap().end().unwrap();
    let outcome = flush_one(&journal, &device.signer, &server, end).unwrap();
    assert!(matches!(outcome, FlushOutcome::Flushed { .. }), "{:?}", outcome);
    similar_asserts::assert_eq!(
        server.history(&device.tlf, BranchId::NULL)[2].md.prev_root(),
        Some(ids[1])
    );
}
