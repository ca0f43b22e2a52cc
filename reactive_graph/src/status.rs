// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node status word: a type tag plus a handful of independent flags.
//!
//! The spec describes one packed machine word with TYPE/STATE/FLAGS bit
//! regions. TYPE and the FLAGS (`SCHEDULED`, `DISPOSED`, `COMPUTING`) are a
//! genuine bitset — any subset can be set independently — so they use
//! [`bitflags`]. STATE (`CLEAN`/`PENDING`/`DIRTY`) is a three-way exclusive
//! choice, not a bitset, so it is a plain enum ([`NodeState`]) stored
//! alongside the flags rather than packed into the same bits: the enum makes
//! the "exactly one state at a time" invariant (spec §3 invariant 6)
//! unrepresentable-to-violate instead of merely convention.

use bitflags::bitflags;

bitflags! {
    /// Type tag and independent flag bits for a node.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub(crate) struct Status: u8 {
        /// Pure producer (spec §3 "Signal").
        const SIGNAL = 0b0000_0001;
        /// Producer + consumer hybrid (spec §3 "Derived").
        const DERIVED = 0b0000_0010;
        /// Pure consumer (spec §3 "Effect").
        const EFFECT = 0b0000_0100;
        /// Enqueued on the scheduler, not yet run.
        const SCHEDULED = 0b0000_1000;
        /// Disposed: no longer part of the live graph.
        const DISPOSED = 0b0001_0000;
        /// Currently being recomputed; re-entry is a cycle (spec §4.6 step 4).
        const COMPUTING = 0b0010_0000;
    }
}

/// The three-way recompute state of a producer/derived node.
///
/// Effects reuse `Pending` for "invalidated, not yet rerun"; they never
/// reach `Dirty` (only signals and settled derived nodes carry a value that
/// can be known-changed ahead of recomputation).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum NodeState {
    /// Cached value (if any) is known consistent with current ancestors.
    Clean,
    /// May be stale; must verify by settling ancestors before trusting it.
    Pending,
    /// Known stale; recompute unconditionally on next settle.
    Dirty,
}

#[cfg(test)]
mod tests {
    use super::{NodeState, Status};

    #[test]
    fn flags_are_independent() {
        let mut status = Status::DERIVED;
        status.insert(Status::SCHEDULED);
        assert!(status.contains(Status::DERIVED));
        assert!(status.contains(Status::SCHEDULED));
        assert!(!status.contains(Status::DISPOSED));
        status.remove(Status::SCHEDULED);
        assert!(!status.contains(Status::SCHEDULED));
        assert!(status.contains(Status::DERIVED));
    }

    #[test]
    fn states_are_mutually_exclusive_by_construction() {
        let a = NodeState::Pending;
        let b = NodeState::Dirty;
        assert_ne!(a, b);
    }
}
