// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dependency tracker: `track(consumer, f)` and `trackDependency` (spec §4.4).
//!
//! `track` is a scope guard: steps 4 (restore current consumer) and 5
//! (prune stale edges) run via a `Drop` guard, so they execute whether `f`
//! returns normally or the stack unwinds through it — the no_std-compatible
//! reading of "exceptions propagate, but steps 4-5 MUST still execute."

use crate::edge;
use crate::id::NodeId;
use crate::runtime::Runtime;

/// Runs `f` with `consumer` as the current consumer, bumping its tracking
/// version first and pruning stale dependency edges afterward (spec §4.4).
///
/// `f` is given no arguments; it reaches the runtime through whatever
/// `Runtime` handle it closed over, performing its own short borrows of
/// the runtime's interior — `track` itself never holds a borrow while `f`
/// runs, which is what lets `f` read other nodes through the same runtime.
pub(crate) fn track<R>(runtime: &Runtime, consumer: NodeId, f: impl FnOnce() -> R) -> R {
    let previous_consumer = {
        let mut inner = runtime.borrow_inner_mut();
        let previous = inner.context.enter(consumer);
        if let Some(node) = inner.node_mut(consumer) {
            node.tracking_version = node.tracking_version.wrapping_add(1);
        }
        edge::reset_cursor(&mut inner.nodes, consumer);
        previous
    };

    let guard = RestoreGuard {
        runtime,
        consumer,
        previous_consumer,
    };
    let result = f();
    drop(guard);
    result
}

struct RestoreGuard<'a> {
    runtime: &'a Runtime,
    consumer: NodeId,
    previous_consumer: Option<NodeId>,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.runtime.borrow_inner_mut();
        inner.context.restore(self.previous_consumer);

        let mut pruned = alloc::vec::Vec::new();
        edge::prune_stale_dependencies(&mut inner.nodes, &mut inner.edges, self.consumer, |producer, consumer| {
            pruned.push((producer, consumer));
        });
        for (producer, consumer) in pruned {
            inner.counters.record_prune();
            inner.hooks.on_dependency_pruned(producer, consumer);
        }
    }
}

/// Records that `consumer` read `producer` during the tracked evaluation
/// currently in progress. Implements the three fast paths of spec §4.4.
///
/// No-op if `consumer` is not actually mid-tracking (i.e. there is no
/// current consumer — reads outside of `track`, such as `untrack`, do not
/// create edges).
pub(crate) fn track_dependency(runtime: &Runtime, producer: NodeId, consumer: NodeId) {
    let mut inner = runtime.borrow_inner_mut();
    let version = match inner.node(consumer) {
        Some(node) => node.tracking_version,
        None => return,
    };

    // Fast path 1: the cursor's edge already points at `producer`.
    if let Some(cursor_id) = edge::cursor(&inner.nodes, consumer) {
        if edge::edge_producer(&inner.edges, cursor_id) == Some(producer) {
            edge::set_edge_version(&mut inner.edges, cursor_id, version);
            inner.counters.record_track();
            inner.hooks.on_dependency_tracked(producer, consumer);
            return;
        }
    }

    // Fast path 2: the edge right after the cursor points at `producer`.
    if let Some(next_id) = edge::cursor_next(&inner.nodes, &inner.edges, consumer) {
        if edge::edge_producer(&inner.edges, next_id) == Some(producer) {
            edge::set_edge_version(&mut inner.edges, next_id, version);
            edge::advance_cursor(&mut inner.nodes, consumer, next_id);
            inner.counters.record_track();
            inner.hooks.on_dependency_tracked(producer, consumer);
            return;
        }
    }

    // Fast path 3: no existing edge matched; splice a fresh one in.
    edge::insert_dependency(&mut inner.nodes, &mut inner.edges, producer, consumer, version);
    inner.counters.record_track();
    inner.hooks.on_dependency_tracked(producer, consumer);
}

#[cfg(test)]
mod tests {
    use crate::runtime::Runtime;

    #[test]
    fn reading_two_signals_produces_their_sum() {
        let runtime = Runtime::new();
        let a = runtime.signal(1_i32);
        let b = runtime.signal(2_i32);
        let d = runtime.derived(move || a.get() + b.get());
        assert_eq!(d.get(), 3);
        assert_eq!(d.get(), 3);
    }
}
