// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;

#[test]
fn uninitialized_is_not_valid() {
    assert!(!Revision::UNINITIALIZED.is_valid());
    assert!(Revision::INITIAL.is_valid());
}

#[test]
fn next_stops_at_overflow() {
    assert_eq!(Revision(u64::MAX).next(), None);
    assert_eq!(Revision::INITIAL.next(), Some(Revision(2)));
}

proptest! {
    #[test]
    fn checked_add_agrees_with_repeated_next(start in 0u64..1_000_000, n in 0u64..64) {
        let mut rev = Revision(start);
        for _ in 0..n {
            rev = rev.next().unwrap();
        }
        prop_assert_eq!(Revision(start).checked_add(n), Some(rev));
    }
}
