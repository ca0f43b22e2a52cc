// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The invalidation propagator: push walk from a write (spec §4.5).
//!
//! An explicit `Vec`-backed stack stands in for the spec's "linked-list
//! stack of visit frames" — both are non-recursive and tolerate arbitrarily
//! deep chains without growing the host call stack, which is the property
//! spec §9 actually requires ("cooperative control flow").
//!
//! This only performs bookkeeping (marking state, setting `SCHEDULED`,
//! appending to the scheduler's queue) and never calls user code, so it can
//! run entirely under one runtime borrow. Effects it newly schedules are
//! returned to the caller, which decides whether to flush them immediately
//! (outside a batch) after releasing that borrow — see
//! `crate::runtime::Runtime::write_signal`.

use alloc::vec::Vec;

use crate::edge;
use crate::id::NodeId;
use crate::runtime::RuntimeInner;
use crate::status::{NodeState, Status};

/// Walks the subgraph reachable from `root`'s subscribers, marking it
/// invalidated and collecting any effects newly scheduled by this walk.
///
/// `eligible_for_dirty_shortcut` gates spec §4.5's "signal-DIRTY
/// optimization": only `root`'s *direct* subscribers may be marked `Dirty`
/// instead of `Pending`, and only when `root` is a signal whose value
/// actually changed (callers pass `false` when propagating from a derived
/// node's recompute, since a derived node recomputing never guarantees its
/// own value changed until after the fact).
pub(crate) fn propagate(
    inner: &mut RuntimeInner,
    root: NodeId,
    eligible_for_dirty_shortcut: bool,
) -> Vec<NodeId> {
    inner.hooks.on_propagate_begin(root);

    let mut newly_scheduled = Vec::new();
    let mut stack: Vec<(NodeId, bool)> = edge::subscriber_ids(&inner.nodes, &inner.edges, root)
        .into_iter()
        .filter_map(|edge_id| edge::edge_consumer(&inner.edges, edge_id))
        .map(|consumer| (consumer, eligible_for_dirty_shortcut))
        .collect();

    while let Some((node_id, direct_subscriber_of_root)) = stack.pop() {
        inner.counters.record_shallow_propagate_call();

        let Some(node) = inner.node(node_id) else {
            continue;
        };
        if node.is_disposed() || !matches!(node.state, NodeState::Clean) {
            // Disposed, or already Pending/Dirty: nothing left to do here
            // (spec §4.5: "subgraph already marked, deduplication").
            continue;
        }

        if node.is_derived() {
            let new_state = if direct_subscriber_of_root {
                NodeState::Dirty
            } else {
                NodeState::Pending
            };
            if let Some(node) = inner.node_mut(node_id) {
                node.state = new_state;
            }
            let children: Vec<NodeId> = edge::subscriber_ids(&inner.nodes, &inner.edges, node_id)
                .into_iter()
                .filter_map(|edge_id| edge::edge_consumer(&inner.edges, edge_id))
                .collect();
            stack.extend(children.into_iter().map(|child| (child, false)));
        } else if node.is_effect() {
            if let Some(node) = inner.node_mut(node_id) {
                node.state = NodeState::Pending;
                if !node.status.contains(Status::SCHEDULED) {
                    node.status.insert(Status::SCHEDULED);
                    inner.scheduler.enqueue(node_id);
                    newly_scheduled.push(node_id);
                }
            }
        }
    }

    inner.hooks.on_propagate_end(root);
    newly_scheduled
}

#[cfg(test)]
mod tests {
    use crate::runtime::Runtime;

    #[test]
    fn diamond_recomputes_the_bottom_exactly_once() {
        let runtime = Runtime::new();
        let s = runtime.signal(0_i32);
        let recomputes = alloc::rc::Rc::new(core::cell::Cell::new(0_u32));

        let left = {
            let s = s.clone();
            runtime.derived(move || s.get() * 2)
        };
        let right = {
            let s = s.clone();
            runtime.derived(move || s.get() * 3)
        };
        let bottom = {
            let recomputes = recomputes.clone();
            let left = left.clone();
            let right = right.clone();
            runtime.derived(move || {
                recomputes.set(recomputes.get() + 1);
                left.get() + right.get()
            })
        };

        assert_eq!(bottom.get(), 0);
        let before = recomputes.get();
        s.set(1);
        assert_eq!(bottom.get(), 5);
        assert_eq!(recomputes.get(), before + 1);
    }
}
