// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Optional observability hooks (spec §6, §9 "operational signals").
//!
//! Modeled on `understory_dirty`'s `trace` module: the core graph does not
//! store *why* a node became dirty, but offers narrow, additive hooks for
//! embedders that want to answer that question, plus running counters for
//! the three signals the spec's design notes call out by name
//! (`trackCount`, `pruneCount`, `shallowPropagateCallCount`).

use core::cell::Cell;

use crate::error::GraphError;
use crate::id::NodeId;

/// Observability callbacks. All methods have no-op default bodies, so an
/// implementer only overrides the ones they care about.
pub trait Hooks {
    /// A dependency edge was created or refreshed during tracking.
    fn on_dependency_tracked(&self, _producer: NodeId, _consumer: NodeId) {}
    /// A stale dependency edge was pruned at the end of tracking.
    fn on_dependency_pruned(&self, _producer: NodeId, _consumer: NodeId) {}
    /// Invalidation propagation from a write is about to start.
    fn on_propagate_begin(&self, _root: NodeId) {}
    /// Invalidation propagation from a write has finished.
    fn on_propagate_end(&self, _root: NodeId) {}
    /// A derived node's compute function ran to completion.
    fn on_recompute(&self, _node: NodeId) {}
    /// An effect's run function returned an error.
    fn on_effect_error(&self, _node: NodeId, _error: &GraphError) {}
}

/// The default, zero-cost set of hooks: does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl Hooks for NoopHooks {}

/// Running counters a [`crate::runtime::Runtime`] maintains regardless of
/// which [`Hooks`] implementation is installed.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    track_count: Cell<u64>,
    prune_count: Cell<u64>,
    shallow_propagate_call_count: Cell<u64>,
}

impl Counters {
    pub(crate) fn record_track(&self) {
        self.track_count.set(self.track_count.get() + 1);
    }

    pub(crate) fn record_prune(&self) {
        self.prune_count.set(self.prune_count.get() + 1);
    }

    pub(crate) fn record_shallow_propagate_call(&self) {
        self.shallow_propagate_call_count
            .set(self.shallow_propagate_call_count.get() + 1);
    }

    pub(crate) fn snapshot(&self) -> RuntimeStats {
        RuntimeStats {
            track_count: self.track_count.get(),
            prune_count: self.prune_count.get(),
            shallow_propagate_call_count: self.shallow_propagate_call_count.get(),
        }
    }
}

/// A point-in-time snapshot of a runtime's operational counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RuntimeStats {
    /// Number of completed `track(consumer, f)` evaluations.
    pub track_count: u64,
    /// Number of stale dependency edges pruned across all trackings.
    pub prune_count: u64,
    /// Number of times the invalidation propagator's walk visited a node.
    pub shallow_propagate_call_count: u64,
}

#[cfg(test)]
mod tests {
    use super::Counters;

    #[test]
    fn counters_accumulate() {
        let counters = Counters::default();
        counters.record_track();
        counters.record_track();
        counters.record_prune();
        let stats = counters.snapshot();
        assert_eq!(stats.track_count, 2);
        assert_eq!(stats.prune_count, 1);
        assert_eq!(stats.shallow_propagate_call_count, 0);
    }
}
