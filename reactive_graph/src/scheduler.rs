// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Batch depth and the pending-effects queue (spec §4.7).

use alloc::collections::VecDeque;

use crate::id::NodeId;

#[derive(Default)]
pub(crate) struct Scheduler {
    batch_depth: u32,
    pending_effects: VecDeque<NodeId>,
}

impl Scheduler {
    pub(crate) const fn new() -> Self {
        Self {
            batch_depth: 0,
            pending_effects: VecDeque::new(),
        }
    }

    pub(crate) fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    pub(crate) fn start_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Returns `true` when this closes the outermost batch, i.e. the caller
    /// must now drain `pending_effects`.
    pub(crate) fn end_batch(&mut self) -> bool {
        debug_assert!(self.batch_depth > 0, "end_batch without a matching start_batch");
        self.batch_depth = self.batch_depth.saturating_sub(1);
        self.batch_depth == 0
    }

    /// Appends `effect` to the FIFO queue. The caller is responsible for
    /// having already set the effect's `SCHEDULED` flag and for checking it
    /// was not already set (spec: "if not already SCHEDULED").
    pub(crate) fn enqueue(&mut self, effect: NodeId) {
        self.pending_effects.push_back(effect);
    }

    pub(crate) fn drain(&mut self) -> alloc::vec::Vec<NodeId> {
        self.pending_effects.drain(..).collect()
    }
}
