// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational arena handles for nodes and edges.

/// A stable handle into the node arena.
///
/// Consists of a slot index and a generation counter. A handle whose
/// generation no longer matches the slot's current generation refers to a
/// disposed, reused slot and is treated as dead.
///
/// Opaque to callers: construction and the index/generation accessors stay
/// crate-private. It is `pub` only because [`crate::instrument::Hooks`]
/// hands it back to embedders for correlating events (spec §9 "operational
/// signals") — they can store, compare, and hash it, nothing more.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(u32, u32);

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self(index, generation)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

/// A stable handle into the edge arena. Same generational scheme as [`NodeId`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) struct EdgeId(u32, u32);

impl EdgeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self(index, generation)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}
