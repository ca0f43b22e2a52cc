// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracking context: the current-consumer slot (spec §4.3).
//!
//! Per spec §9 design notes, this is not a process-wide singleton; it is a
//! field owned by each [`crate::runtime::Runtime`], so multiple runtimes
//! are fully isolated from one another.

use crate::id::NodeId;

#[derive(Default)]
pub(crate) struct TrackingContext {
    current_consumer: Option<NodeId>,
}

impl TrackingContext {
    pub(crate) const fn new() -> Self {
        Self {
            current_consumer: None,
        }
    }

    pub(crate) fn current(&self) -> Option<NodeId> {
        self.current_consumer
    }

    /// Sets the current consumer, returning the previous one so the caller
    /// can restore it later.
    pub(crate) fn enter(&mut self, consumer: NodeId) -> Option<NodeId> {
        core::mem::replace(&mut self.current_consumer, Some(consumer))
    }

    /// Suppresses tracking entirely (spec §6 `untrack`), returning the
    /// previous current consumer so the caller can restore it later.
    pub(crate) fn suspend(&mut self) -> Option<NodeId> {
        core::mem::take(&mut self.current_consumer)
    }

    pub(crate) fn restore(&mut self, previous: Option<NodeId>) {
        self.current_consumer = previous;
    }
}

#[cfg(test)]
mod tests {
    use super::TrackingContext;
    use crate::id::NodeId;

    #[test]
    fn enter_and_restore_round_trips() {
        let mut context = TrackingContext::new();
        assert_eq!(context.current(), None);
        let consumer = NodeId::new(0, 0);
        let previous = context.enter(consumer);
        assert_eq!(context.current(), Some(consumer));
        context.restore(previous);
        assert_eq!(context.current(), None);
    }

    #[test]
    fn suspend_clears_then_restores() {
        let mut context = TrackingContext::new();
        let consumer = NodeId::new(0, 0);
        context.enter(consumer);
        let previous = context.suspend();
        assert_eq!(context.current(), None);
        context.restore(previous);
        assert_eq!(context.current(), Some(consumer));
    }
}
