//! Behavioral specifications for the metadata journal.
//!
//! These tests drive the public journal API end to end against real
//! temporary directories and the in-memory metadata server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// journal/
#[path = "specs/journal/ordering.rs"]
mod journal_ordering;
#[path = "specs/journal/branching.rs"]
mod journal_branching;
#[path = "specs/journal/config.rs"]
mod journal_config;

// flush/
#[path = "specs/flush/drain.rs"]
mod flush_drain;
#[path = "specs/flush/conflict.rs"]
mod flush_conflict;

// recovery/
#[path = "specs/recovery/swap.rs"]
mod recovery_swap;
