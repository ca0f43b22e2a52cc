// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The edge store: intrusive doubly-linked dependency edges (spec §3, §4.2).
//!
//! One [`Edge`] exists per live (producer, consumer) pairing. It is linked
//! into two lists at once: the producer's *subscribers* list and the
//! consumer's *dependencies* list, both tail-ordered, which is what makes
//! propagation and tracking order match attachment order (spec §5
//! "Ordering"). Edge creation always happens through
//! [`insert_dependency`], which splices a new edge immediately after the
//! consumer's current tracking cursor rather than at the list's physical
//! end — this is what lets [`prune_stale_dependencies`] later detach
//! exactly the unread suffix in one linear pass (spec §4.4 step 5), even
//! when a dependency is read out of its previous order.
//!
//! Nodes and edges are generalized from `understory_dirty`'s per-channel
//! `Vec<Vec<K>>` adjacency (`graph.rs`) to these intrusive, arena-indexed
//! lists, since the spec requires O(1) attach/detach and the teacher's
//! adjacency-list representation is O(n) to detach a single edge.

use alloc::vec::Vec;

use crate::arena::Arena;
use crate::id::{EdgeId, NodeId};
use crate::node::Node;

pub(crate) struct Edge {
    pub(crate) producer: NodeId,
    pub(crate) consumer: NodeId,
    pub(crate) prev_dep: Option<EdgeId>,
    pub(crate) next_dep: Option<EdgeId>,
    pub(crate) prev_sub: Option<EdgeId>,
    pub(crate) next_sub: Option<EdgeId>,
    /// The consumer's `tracking_version` as of the last time this edge was
    /// observed during a tracked evaluation (spec §3 invariant 4).
    pub(crate) version: u32,
}

fn node_mut<'a>(nodes: &'a mut Arena<Node>, id: NodeId) -> Option<&'a mut Node> {
    nodes.get_mut(id.index() as u32, id.generation())
}

fn node_ref<'a>(nodes: &'a Arena<Node>, id: NodeId) -> Option<&'a Node> {
    nodes.get(id.index() as u32, id.generation())
}

fn edge_mut<'a>(edges: &'a mut Arena<Edge>, id: EdgeId) -> Option<&'a mut Edge> {
    edges.get_mut(id.index() as u32, id.generation())
}

fn edge_ref<'a>(edges: &'a Arena<Edge>, id: EdgeId) -> Option<&'a Edge> {
    edges.get(id.index() as u32, id.generation())
}

/// Appends `edge` to the true end of `producer`'s subscribers list. O(1).
fn link_subscriber(nodes: &mut Arena<Node>, edges: &mut Arena<Edge>, producer: NodeId, edge_id: EdgeId) {
    let old_tail = match node_mut(nodes, producer) {
        Some(node) => {
            let old_tail = node.subscribers_tail;
            node.subscribers_tail = Some(edge_id);
            if node.subscribers_head.is_none() {
                node.subscribers_head = Some(edge_id);
            }
            old_tail
        }
        None => None,
    };
    if let Some(old_tail) = old_tail {
        if let Some(old_tail_edge) = edge_mut(edges, old_tail) {
            old_tail_edge.next_sub = Some(edge_id);
        }
    }
    if let Some(edge) = edge_mut(edges, edge_id) {
        edge.prev_sub = old_tail;
    }
}

/// Unlinks `edge_id` from its producer's subscribers list only. The caller
/// is responsible for the edge's dependency-list linkage and arena slot.
fn unlink_subscriber(nodes: &mut Arena<Node>, edges: &mut Arena<Edge>, edge_id: EdgeId) {
    let Some(edge) = edge_ref(edges, edge_id) else {
        return;
    };
    let (producer, prev_sub, next_sub) = (edge.producer, edge.prev_sub, edge.next_sub);

    match prev_sub {
        Some(prev) => {
            if let Some(prev_edge) = edge_mut(edges, prev) {
                prev_edge.next_sub = next_sub;
            }
        }
        None => {
            if let Some(node) = node_mut(nodes, producer) {
                node.subscribers_head = next_sub;
            }
        }
    }
    match next_sub {
        Some(next) => {
            if let Some(next_edge) = edge_mut(edges, next) {
                next_edge.prev_sub = prev_sub;
            }
        }
        None => {
            if let Some(node) = node_mut(nodes, producer) {
                node.subscribers_tail = prev_sub;
            }
        }
    }
}

/// Unlinks `edge_id` from its consumer's dependencies list only. The caller
/// is responsible for the edge's subscriber-list linkage and arena slot.
fn unlink_dependency(nodes: &mut Arena<Node>, edges: &mut Arena<Edge>, edge_id: EdgeId) {
    let Some(edge) = edge_ref(edges, edge_id) else {
        return;
    };
    let (consumer, prev_dep, next_dep) = (edge.consumer, edge.prev_dep, edge.next_dep);

    match prev_dep {
        Some(prev) => {
            if let Some(prev_edge) = edge_mut(edges, prev) {
                prev_edge.next_dep = next_dep;
            }
        }
        None => {
            if let Some(node) = node_mut(nodes, consumer) {
                node.dependencies_head = next_dep;
            }
        }
    }
    match next_dep {
        Some(next) => {
            if let Some(next_edge) = edge_mut(edges, next) {
                next_edge.prev_dep = prev_dep;
            }
        }
        None => {
            if let Some(node) = node_mut(nodes, consumer) {
                node.dependencies_tail = prev_dep;
            }
        }
    }
}

/// Detaches every subscriber edge of `producer` from both lists and the
/// arena. Used when disposing a producer (signal or derived) that still
/// has live subscribers (spec §4.8): those subscribers must stop seeing it
/// as a dependency, since it is leaving the graph regardless of whether
/// they have re-tracked since.
pub(crate) fn dispose_subscribers(
    nodes: &mut Arena<Node>,
    edges: &mut Arena<Edge>,
    producer: NodeId,
    mut on_pruned: impl FnMut(NodeId, NodeId),
) {
    let mut cursor = node_ref(nodes, producer).and_then(|node| node.subscribers_head);
    while let Some(edge_id) = cursor {
        let Some(edge) = edge_ref(edges, edge_id) else {
            break;
        };
        let next = edge.next_sub;
        let consumer = edge.consumer;
        unlink_dependency(nodes, edges, edge_id);
        edges.remove(edge_id.index() as u32, edge_id.generation());
        on_pruned(producer, consumer);
        cursor = next;
    }
    if let Some(node) = node_mut(nodes, producer) {
        node.subscribers_head = None;
        node.subscribers_tail = None;
    }
}

/// Resets `consumer`'s tracking cursor to "before the first dependency",
/// the first step of `track(consumer, f)` (spec §4.4 step 2).
pub(crate) fn reset_cursor(nodes: &mut Arena<Node>, consumer: NodeId) {
    if let Some(node) = node_mut(nodes, consumer) {
        node.dependencies_tail = None;
    }
}

/// The edge immediately following the consumer's current tracking cursor,
/// i.e. the next candidate `trackDependency` compares against in its second
/// fast path (spec §4.4).
pub(crate) fn cursor_next(nodes: &Arena<Node>, edges: &Arena<Edge>, consumer: NodeId) -> Option<EdgeId> {
    match node_ref(nodes, consumer).and_then(|node| node.dependencies_tail) {
        Some(cursor) => edge_ref(edges, cursor).and_then(|edge| edge.next_dep),
        None => node_ref(nodes, consumer).and_then(|node| node.dependencies_head),
    }
}

pub(crate) fn cursor(nodes: &Arena<Node>, consumer: NodeId) -> Option<EdgeId> {
    node_ref(nodes, consumer).and_then(|node| node.dependencies_tail)
}

pub(crate) fn edge_producer(edges: &Arena<Edge>, edge_id: EdgeId) -> Option<NodeId> {
    edge_ref(edges, edge_id).map(|edge| edge.producer)
}

pub(crate) fn edge_consumer(edges: &Arena<Edge>, edge_id: EdgeId) -> Option<NodeId> {
    edge_ref(edges, edge_id).map(|edge| edge.consumer)
}

pub(crate) fn set_edge_version(edges: &mut Arena<Edge>, edge_id: EdgeId, version: u32) {
    if let Some(edge) = edge_mut(edges, edge_id) {
        edge.version = version;
    }
}

/// Advances `consumer`'s tracking cursor to `edge_id` without otherwise
/// touching the list (used by `trackDependency`'s fast paths 1 and 2).
pub(crate) fn advance_cursor(nodes: &mut Arena<Node>, consumer: NodeId, edge_id: EdgeId) {
    if let Some(node) = node_mut(nodes, consumer) {
        node.dependencies_tail = Some(edge_id);
    }
}

/// Splices a brand-new edge into `consumer`'s dependency list immediately
/// after its current cursor (at the head if the cursor is `None`), appends
/// it to `producer`'s subscriber list, and advances the cursor to it. This
/// is `trackDependency`'s third fast path: no existing edge matched, so a
/// new one is created (spec §4.4).
pub(crate) fn insert_dependency(
    nodes: &mut Arena<Node>,
    edges: &mut Arena<Edge>,
    producer: NodeId,
    consumer: NodeId,
    version: u32,
) -> EdgeId {
    let after = cursor(nodes, consumer);
    let old_next = cursor_next(nodes, edges, consumer);

    let (index, generation) = edges.insert(Edge {
        producer,
        consumer,
        prev_dep: after,
        next_dep: old_next,
        prev_sub: None,
        next_sub: None,
        version,
    });
    let new_id = EdgeId::new(index, generation);

    match after {
        Some(after_id) => {
            if let Some(after_edge) = edge_mut(edges, after_id) {
                after_edge.next_dep = Some(new_id);
            }
        }
        None => {
            if let Some(node) = node_mut(nodes, consumer) {
                node.dependencies_head = Some(new_id);
            }
        }
    }
    match old_next {
        Some(next_id) => {
            if let Some(next_edge) = edge_mut(edges, next_id) {
                next_edge.prev_dep = Some(new_id);
            }
        }
        None => {
            if let Some(node) = node_mut(nodes, consumer) {
                node.dependencies_tail = Some(new_id);
            }
        }
    }

    link_subscriber(nodes, edges, producer, new_id);
    advance_cursor(nodes, consumer, new_id);
    new_id
}

/// Detaches every dependency edge after `consumer`'s current cursor (the
/// stale suffix left over from a tracked run) from both its producer's
/// subscribers list and the arena, and fixes up `consumer`'s dependency
/// list to end at the cursor. Calling this with the cursor reset to `None`
/// (no dependency confirmed) detaches the entire list — this is how a
/// consumer's disposal releases all of its outgoing edges (spec §4.8).
///
/// `on_pruned(producer, consumer)` is invoked once per detached edge.
pub(crate) fn prune_stale_dependencies(
    nodes: &mut Arena<Node>,
    edges: &mut Arena<Edge>,
    consumer: NodeId,
    mut on_pruned: impl FnMut(NodeId, NodeId),
) {
    let cursor = cursor(nodes, consumer);
    let mut stale = cursor_next(nodes, edges, consumer);

    match cursor {
        Some(cursor_id) => {
            if let Some(cursor_edge) = edge_mut(edges, cursor_id) {
                cursor_edge.next_dep = None;
            }
        }
        None => {
            if let Some(node) = node_mut(nodes, consumer) {
                node.dependencies_head = None;
            }
        }
    }
    if let Some(node) = node_mut(nodes, consumer) {
        node.dependencies_tail = cursor;
    }

    while let Some(stale_id) = stale {
        let Some(stale_edge) = edge_ref(edges, stale_id) else {
            break;
        };
        let next = stale_edge.next_dep;
        let producer = stale_edge.producer;
        unlink_subscriber(nodes, edges, stale_id);
        edges.remove(stale_id.index() as u32, stale_id.generation());
        on_pruned(producer, consumer);
        stale = next;
    }
}

/// Walks the subscribers of `producer` from head to tail, collecting ids.
///
/// Collected eagerly (not a lazy iterator borrowing the arena) because
/// callers mutate the arena while visiting subscribers (propagation marks
/// nodes and may recurse into their own subscribers).
pub(crate) fn subscriber_ids(nodes: &Arena<Node>, edges: &Arena<Edge>, producer: NodeId) -> Vec<EdgeId> {
    let mut ids = Vec::new();
    let mut cursor = node_ref(nodes, producer).and_then(|node| node.subscribers_head);
    while let Some(edge_id) = cursor {
        ids.push(edge_id);
        cursor = edge_ref(edges, edge_id).and_then(|edge| edge.next_sub);
    }
    ids
}

/// Walks the dependencies of `consumer` from head to tail, collecting ids.
pub(crate) fn dependency_ids(nodes: &Arena<Node>, edges: &Arena<Edge>, consumer: NodeId) -> Vec<EdgeId> {
    let mut ids = Vec::new();
    let mut cursor = node_ref(nodes, consumer).and_then(|node| node.dependencies_head);
    while let Some(edge_id) = cursor {
        ids.push(edge_id);
        cursor = edge_ref(edges, edge_id).and_then(|edge| edge.next_dep);
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equality::EqualityPredicate;
    use alloc::boxed::Box;

    fn new_signal_node(nodes: &mut Arena<Node>) -> NodeId {
        let (index, generation) = nodes.insert(Node::signal(
            Box::new(0_i32),
            EqualityPredicate::by_partial_eq::<i32>(),
        ));
        NodeId::new(index, generation)
    }

    #[test]
    fn insert_links_both_lists_and_advances_cursor() {
        let mut nodes = Arena::new();
        let mut edges = Arena::new();
        let producer = new_signal_node(&mut nodes);
        let consumer = new_signal_node(&mut nodes);

        let edge = insert_dependency(&mut nodes, &mut edges, producer, consumer, 1);

        assert_eq!(subscriber_ids(&nodes, &edges, producer), alloc::vec![edge]);
        assert_eq!(dependency_ids(&nodes, &edges, consumer), alloc::vec![edge]);
        assert_eq!(cursor(&nodes, consumer), Some(edge));
    }

    #[test]
    fn prune_from_reset_cursor_drops_whole_list() {
        let mut nodes = Arena::new();
        let mut edges = Arena::new();
        let p1 = new_signal_node(&mut nodes);
        let p2 = new_signal_node(&mut nodes);
        let consumer = new_signal_node(&mut nodes);

        insert_dependency(&mut nodes, &mut edges, p1, consumer, 1);
        insert_dependency(&mut nodes, &mut edges, p2, consumer, 1);
        reset_cursor(&mut nodes, consumer);

        let mut pruned = Vec::new();
        prune_stale_dependencies(&mut nodes, &mut edges, consumer, |producer, _| pruned.push(producer));

        assert_eq!(pruned, alloc::vec![p1, p2]);
        assert!(dependency_ids(&nodes, &edges, consumer).is_empty());
        assert!(subscriber_ids(&nodes, &edges, p1).is_empty());
        assert!(subscriber_ids(&nodes, &edges, p2).is_empty());
    }

    #[test]
    fn prune_keeps_confirmed_prefix_and_drops_unread_suffix() {
        let mut nodes = Arena::new();
        let mut edges = Arena::new();
        let a = new_signal_node(&mut nodes);
        let b = new_signal_node(&mut nodes);
        let c = new_signal_node(&mut nodes);
        let consumer = new_signal_node(&mut nodes);

        let edge_a = insert_dependency(&mut nodes, &mut edges, a, consumer, 1);
        insert_dependency(&mut nodes, &mut edges, b, consumer, 1);
        insert_dependency(&mut nodes, &mut edges, c, consumer, 1);

        // A fresh run that only re-confirms `a`: reset the cursor, then
        // replay fast-path-1 against the existing head edge.
        reset_cursor(&mut nodes, consumer);
        advance_cursor(&mut nodes, consumer, edge_a);
        set_edge_version(&mut edges, edge_a, 2);

        let mut pruned = Vec::new();
        prune_stale_dependencies(&mut nodes, &mut edges, consumer, |producer, _| pruned.push(producer));

        assert_eq!(pruned, alloc::vec![b, c]);
        assert_eq!(dependency_ids(&nodes, &edges, consumer), alloc::vec![edge_a]);
    }

    #[test]
    fn out_of_order_reread_creates_transient_duplicate_then_prunes_old_one() {
        let mut nodes = Arena::new();
        let mut edges = Arena::new();
        let a = new_signal_node(&mut nodes);
        let b = new_signal_node(&mut nodes);
        let consumer = new_signal_node(&mut nodes);

        insert_dependency(&mut nodes, &mut edges, a, consumer, 1);
        let edge_b_old = insert_dependency(&mut nodes, &mut edges, b, consumer, 1);

        // Next run reads `b` first: neither fast path matches (tail is None,
        // head is `a`'s edge), so a brand new edge for `b` is spliced in.
        reset_cursor(&mut nodes, consumer);
        let edge_b_new = insert_dependency(&mut nodes, &mut edges, b, consumer, 2);
        assert_ne!(edge_b_new, edge_b_old);

        let mut pruned = Vec::new();
        prune_stale_dependencies(&mut nodes, &mut edges, consumer, |producer, _| pruned.push(producer));

        // The old `a` and old `b` edges are stale; only the freshly spliced
        // `b` edge survives.
        assert_eq!(pruned, alloc::vec![a, b]);
        assert_eq!(dependency_ids(&nodes, &edges, consumer), alloc::vec![edge_b_new]);
    }

    #[test]
    fn dispose_subscribers_detaches_both_directions() {
        let mut nodes = Arena::new();
        let mut edges = Arena::new();
        let producer = new_signal_node(&mut nodes);
        let consumer_a = new_signal_node(&mut nodes);
        let consumer_b = new_signal_node(&mut nodes);

        insert_dependency(&mut nodes, &mut edges, producer, consumer_a, 1);
        insert_dependency(&mut nodes, &mut edges, producer, consumer_b, 1);

        let mut pruned = Vec::new();
        dispose_subscribers(&mut nodes, &mut edges, producer, |p, c| pruned.push((p, c)));

        assert_eq!(pruned, alloc::vec![(producer, consumer_a), (producer, consumer_b)]);
        assert!(subscriber_ids(&nodes, &edges, producer).is_empty());
        assert!(dependency_ids(&nodes, &edges, consumer_a).is_empty());
        assert!(dependency_ids(&nodes, &edges, consumer_b).is_empty());
    }
}
