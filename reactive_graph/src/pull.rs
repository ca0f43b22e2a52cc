// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pull evaluator: on-demand settling of PENDING/DIRTY derived nodes
//! (spec §4.6).
//!
//! `settle` uses ordinary Rust recursion rather than an explicit stack.
//! Unlike the invalidation propagator (`propagate.rs`, which is the walk
//! the spec's §9 "cooperative control flow" note is really about — it runs
//! unconditionally on every write), settling only recurses along the depth
//! of a single read's ancestor chain, which for realistic dependency graphs
//! is bounded well within the host stack; see `DESIGN.md` for the recorded
//! trade-off against hand-rolling an iterative version of this specific
//! walk.
//!
//! Rather than relying on a transient "mark DIRTY, then immediately CLEAN"
//! state dance to communicate "did this ancestor's value just change" up
//! to its caller, `settle` threads that fact through its own return value.
//! This is the same information the spec's step 3b is after, made
//! unambiguous: a PENDING node's direct signal dependencies can never be
//! the source of its own invalidation (if they were, the signal-DIRTY
//! shortcut in `propagate.rs` would have marked this node DIRTY directly,
//! not PENDING), so only derived dependencies need to be asked.

use alloc::vec::Vec;
use core::any::Any;

use crate::edge;
use crate::error::GraphError;
use crate::id::NodeId;
use crate::node::Payload;
use crate::runtime::Runtime;
use crate::status::{NodeState, Status};

/// Ensures `node_id` is CLEAN, recomputing it (and, transitively, any
/// PENDING ancestors) as needed. Returns whether its cached value changed
/// as a direct result of *this* call.
pub(crate) fn settle(runtime: &Runtime, node_id: NodeId) -> Result<bool, GraphError> {
    let state = {
        let inner = runtime.borrow_inner();
        match inner.node(node_id) {
            Some(node) => node.state,
            None => return Ok(false),
        }
    };

    match state {
        NodeState::Clean => Ok(false),
        NodeState::Dirty => recompute(runtime, node_id),
        NodeState::Pending => {
            let derived_dependencies: Vec<NodeId> = {
                let inner = runtime.borrow_inner();
                edge::dependency_ids(&inner.nodes, &inner.edges, node_id)
                    .into_iter()
                    .filter_map(|edge_id| edge::edge_producer(&inner.edges, edge_id))
                    .filter(|producer| {
                        inner
                            .node(*producer)
                            .is_some_and(|node| node.is_derived())
                    })
                    .collect()
            };

            let mut any_changed = false;
            for producer in derived_dependencies {
                any_changed |= settle(runtime, producer)?;
            }

            if any_changed {
                recompute(runtime, node_id)
            } else {
                let mut inner = runtime.borrow_inner_mut();
                if let Some(node) = inner.node_mut(node_id) {
                    node.state = NodeState::Clean;
                }
                Ok(false)
            }
        }
    }
}

/// Unconditionally recomputes `node_id`'s cached value, recording any
/// dependencies read along the way and pruning stale ones (spec §4.6 step
/// 5). Returns whether the new value differs from the previous one.
fn recompute(runtime: &Runtime, node_id: NodeId) -> Result<bool, GraphError> {
    let mut compute = {
        let mut inner = runtime.borrow_inner_mut();
        let node = inner
            .node_mut(node_id)
            .expect("recompute target must be a live node");
        if node.status.contains(Status::COMPUTING) {
            return match inner.cycle_policy {
                crate::runtime::CyclePolicy::Error => Err(GraphError::CycleDetected),
                crate::runtime::CyclePolicy::DebugAssert => {
                    panic!("cycle detected while settling a derived node")
                }
            };
        }
        node.status.insert(Status::COMPUTING);
        match &mut node.payload {
            Payload::Derived { compute, .. } => core::mem::replace(
                compute,
                alloc::boxed::Box::new(|_: &Runtime| Err(GraphError::CycleDetected)),
            ),
            _ => panic!("recompute called on a non-derived node"),
        }
    };

    // `compute` runs with no runtime borrow held, since it may read other
    // nodes through `runtime` (each such read takes its own short borrow).
    let outcome = crate::tracker::track(runtime, node_id, || compute(runtime));

    let mut inner = runtime.borrow_inner_mut();
    if let Some(node) = inner.node_mut(node_id) {
        node.status.remove(Status::COMPUTING);
        if let Payload::Derived { compute: slot, .. } = &mut node.payload {
            *slot = compute;
        }
    }

    match outcome {
        Ok(new_value) => {
            let changed = update_cached_value(&mut inner, node_id, new_value);
            if let Some(node) = inner.node_mut(node_id) {
                node.state = NodeState::Clean;
            }
            inner.hooks.on_recompute(node_id);
            Ok(changed)
        }
        Err(error) => {
            // Node stays (or becomes) DIRTY so the next read retries (spec §7).
            if let Some(node) = inner.node_mut(node_id) {
                node.state = NodeState::Dirty;
            }
            Err(error)
        }
    }
}

fn update_cached_value(
    inner: &mut crate::runtime::RuntimeInner,
    node_id: NodeId,
    new_value: alloc::boxed::Box<dyn Any>,
) -> bool {
    let Some(node) = inner.node_mut(node_id) else {
        return false;
    };
    let Payload::Derived { value, eq, .. } = &mut node.payload else {
        return false;
    };
    let changed = match value.as_deref() {
        Some(old) => !eq.eq(old, new_value.as_ref()),
        None => true,
    };
    *value = Some(new_value);
    changed
}

#[cfg(test)]
mod tests {
    use crate::runtime::Runtime;

    #[test]
    fn clean_derived_does_not_recompute() {
        let runtime = Runtime::new();
        let s = runtime.signal(1_i32);
        let d = {
            let s = s.clone();
            runtime.derived(move || s.get() * 10)
        };
        assert_eq!(d.get(), 10);
        assert_eq!(d.get(), 10);
    }

    #[test]
    fn equal_write_does_not_propagate_or_recompute() {
        let runtime = Runtime::new();
        let s = runtime.signal(0_i32);
        let d = {
            let s = s.clone();
            runtime.derived(move || s.get() + 1)
        };
        assert_eq!(d.get(), 1);
        s.set(0);
        assert_eq!(d.get(), 1);
    }
}
