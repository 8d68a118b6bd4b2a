// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use mdj_core::fake::{make_md_for_test, FakeSigner};
use mdj_core::{MetadataVer, RootMetadata, UserId};

fn tlf() -> TlfId {
    TlfId::from("tlf")
}

fn signed(revision: u64, prev_root: Option<BlobId>) -> RootMetadataSigned {
    let signer = FakeSigner::new("alice");
    let md: RootMetadata = make_md_for_test(
        MetadataVer::V3,
        &tlf(),
        Revision(revision),
        &UserId::from("alice"),
        &signer,
        prev_root,
    );
    RootMetadataSigned::sign(md, &signer, Utc::now()).unwrap()
}

#[test]
fn accepts_a_chain_of_revisions() {
    let server = FakeMdServer::new();
    let first = signed(1, None);
    let first_id = FakeCrypto.make_blob_id(&first.md).unwrap();
    server.put(&first, None).unwrap();
    server.put(&signed(2, Some(first_id)), None).unwrap();

    assert_eq!(server.history(&tlf(), BranchId::NULL).len(), 2);
}

#[test]
fn rejects_a_repeated_revision_as_conflict() {
    let server = FakeMdServer::new();
    server.put(&signed(1, None), None).unwrap();
    let err = server.put(&signed(1, None), None).unwrap_err();
    assert_eq!(
        err,
        ServerError::ConflictRevision {
            expected: Revision(2),
            actual: Revision(1)
        }
    );
    assert!(err.is_revision_conflict());
}

#[test]
fn rejects_a_broken_prev_root() {
    let server = FakeMdServer::new();
    server.put(&signed(1, None), None).unwrap();
    let err = server.put(&signed(2, Some(BlobId::fake(1))), None).unwrap_err();
    assert_eq!(err, ServerError::ConflictPrevRoot(Revision(2)));
    assert!(!err.is_revision_conflict());
}

#[test]
fn rejects_a_bad_signature() {
    let server = FakeMdServer::new();
    let mut rmds = signed(1, None);
    rmds.md.set_serialized_private_metadata(b"tampered".to_vec());
    let err = server.put(&rmds, None).unwrap_err();
    assert!(matches!(err, ServerError::Rejected { .. }));
}

#[test]
fn injected_failures_come_first() {
    let server = FakeMdServer::new();
    server.fail_next_put(ServerError::Unavailable("offline".into()));
    let rmds = signed(1, None);

    assert!(server.put(&rmds, None).is_err());
    server.put(&rmds, None).unwrap();
    assert_eq!(server.calls().len(), 2);
}

#[test]
fn get_for_revision_finds_stored_revision() {
    let server = FakeMdServer::new();
    let rmds = signed(1, None);
    server.put(&rmds, None).unwrap();

    let found = server
        .get_for_revision(&tlf(), BranchId::NULL, MergeStatus::Merged, Revision(1))
        .unwrap();
    assert_eq!(found, Some(rmds));
    let missing = server
        .get_for_revision(&tlf(), BranchId::NULL, MergeStatus::Merged, Revision(2))
        .unwrap();
    assert!(missing.is_none());
    assert_eq!(
        server.calls().last(),
        Some(&ServerCall::GetForRevision {
            branch_id: BranchId::NULL,
            revision: Revision(2)
        })
    );
}
