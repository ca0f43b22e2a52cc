// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The public handle types: `SignalHandle<T>`, `DerivedHandle<T>`,
//! `EffectHandle` (spec §6).
//!
//! Each handle is a cheap `Clone`: an `Rc`-backed [`Runtime`] plus a
//! generational [`NodeId`]. There is no `Rc<RefCell<Node>>` per node (spec
//! §3 "Arena representation" in `SPEC_FULL.md`) — all state lives in the
//! runtime's arenas, so a stale handle (its node disposed and the slot
//! reused) is simply a handle whose `node_id` no longer resolves.

use core::marker::PhantomData;

use crate::error::GraphError;
use crate::id::NodeId;
use crate::node::Payload;
use crate::runtime::Runtime;

/// A read/write reactive value (spec §3 "Signal").
pub struct SignalHandle<T> {
    runtime: Runtime,
    node_id: NodeId,
    _marker: PhantomData<T>,
}

impl<T> Clone for SignalHandle<T> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            node_id: self.node_id,
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> SignalHandle<T> {
    pub(crate) fn new(runtime: Runtime, node_id: NodeId) -> Self {
        Self {
            runtime,
            node_id,
            _marker: PhantomData,
        }
    }

    /// Reads the current value, recording a dependency if called from
    /// inside a tracked evaluation (spec §4.1).
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Reads the current value through `f`, avoiding a clone. Still records
    /// a dependency, same as [`SignalHandle::get`].
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.runtime.record_dependency(self.node_id);
        let inner = self.runtime.borrow_inner();
        let node = inner
            .node(self.node_id)
            .expect("SignalHandle outlived its runtime's node");
        match &node.payload {
            Payload::Signal { value, .. } => f(value
                .downcast_ref::<T>()
                .expect("SignalHandle<T> type mismatch with its node's stored value")),
            _ => panic!("SignalHandle's node_id does not refer to a signal"),
        }
    }

    /// Writes a new value (spec §4.1). A no-op if the signal has been
    /// disposed or compares equal to the current value.
    pub fn set(&self, value: T) {
        self.runtime.write_signal(self.node_id, alloc::boxed::Box::new(value));
    }

    /// Fallible form of [`SignalHandle::set`]: reports writing to a
    /// disposed signal as [`GraphError::DisposedUse`] instead of silently
    /// doing nothing.
    pub fn try_set(&self, value: T) -> Result<(), GraphError> {
        let disposed = {
            let inner = self.runtime.borrow_inner();
            inner.node(self.node_id).map_or(true, |node| node.is_disposed())
        };
        if disposed {
            return Err(GraphError::DisposedUse);
        }
        self.set(value);
        Ok(())
    }

    /// Reads, mutates, and writes back in one step.
    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    /// Removes this signal from the graph, detaching it from every
    /// remaining subscriber (spec §4.8).
    pub fn dispose(&self) {
        self.runtime.dispose_node(self.node_id);
    }
}

/// A lazily-recomputed, cached derived value (spec §3 "Derived").
pub struct DerivedHandle<T> {
    runtime: Runtime,
    node_id: NodeId,
    _marker: PhantomData<T>,
}

impl<T> Clone for DerivedHandle<T> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            node_id: self.node_id,
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> DerivedHandle<T> {
    pub(crate) fn new(runtime: Runtime, node_id: NodeId) -> Self {
        Self {
            runtime,
            node_id,
            _marker: PhantomData,
        }
    }

    /// Settles this node if needed, then returns its cached value,
    /// recording a dependency if called from inside a tracked evaluation
    /// (spec §4.1, §4.6). Panics on [`GraphError::CycleDetected`] or a
    /// [`GraphError::ComputeError`]; use [`DerivedHandle::try_get`] to
    /// handle either explicitly.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.try_get().expect("derived node failed to settle")
    }

    /// Fallible form of [`DerivedHandle::get`].
    pub fn try_get(&self) -> Result<T, GraphError>
    where
        T: Clone,
    {
        self.runtime.settle(self.node_id)?;
        self.runtime.record_dependency(self.node_id);
        let inner = self.runtime.borrow_inner();
        let node = inner
            .node(self.node_id)
            .expect("DerivedHandle outlived its runtime's node");
        match &node.payload {
            Payload::Derived { value, .. } => Ok(value
                .as_ref()
                .expect("a settled derived node always has a cached value")
                .downcast_ref::<T>()
                .expect("DerivedHandle<T> type mismatch with its node's stored value")
                .clone()),
            _ => panic!("DerivedHandle's node_id does not refer to a derived node"),
        }
    }

    /// Removes this derived node from the graph (spec §4.8).
    pub fn dispose(&self) {
        self.runtime.dispose_node(self.node_id);
    }
}

/// A scheduled side effect over one or more signals/derived nodes
/// (spec §3 "Effect").
pub struct EffectHandle {
    runtime: Runtime,
    node_id: NodeId,
}

impl Clone for EffectHandle {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            node_id: self.node_id,
        }
    }
}

impl EffectHandle {
    pub(crate) fn new(runtime: Runtime, node_id: NodeId) -> Self {
        Self { runtime, node_id }
    }

    /// Removes this effect from the graph, running its last cleanup if one
    /// was registered (spec §4.8).
    pub fn dispose(&self) {
        self.runtime.dispose_node(self.node_id);
    }
}

#[cfg(test)]
mod tests {
    use crate::error::GraphError;
    use crate::runtime::Runtime;

    #[test]
    fn disposing_a_signal_twice_is_a_no_op() {
        let runtime = Runtime::new();
        let s = runtime.signal(1_i32);
        s.dispose();
        s.dispose();
        assert_eq!(s.try_set(2), Err(GraphError::DisposedUse));
    }

    #[test]
    fn disposing_an_effect_twice_is_a_no_op() {
        let runtime = Runtime::new();
        let runs = alloc::rc::Rc::new(core::cell::Cell::new(0_u32));
        let s = runtime.signal(0_i32);
        let effect = {
            let runs = runs.clone();
            let s = s.clone();
            runtime.effect(move || {
                runs.set(runs.get() + 1);
                let _ = s.get();
            })
        };
        assert_eq!(runs.get(), 1);
        effect.dispose();
        effect.dispose();
        s.set(1);
        assert_eq!(runs.get(), 1, "a disposed effect must not re-run");
    }

    #[test]
    fn try_set_on_a_disposed_signal_reports_disposed_use() {
        let runtime = Runtime::new();
        let s = runtime.signal(0_i32);
        s.dispose();
        assert_eq!(s.try_set(1), Err(GraphError::DisposedUse));
    }

    #[test]
    fn signal_by_uses_the_custom_predicate_instead_of_partial_eq() {
        let runtime = Runtime::new();
        let recomputes = alloc::rc::Rc::new(core::cell::Cell::new(0_u32));
        let s = runtime.signal_by(1.0_f64, |a, b| (a - b).abs() < 0.5);
        let d = {
            let recomputes = recomputes.clone();
            let s = s.clone();
            runtime.derived(move || {
                recomputes.set(recomputes.get() + 1);
                s.get()
            })
        };
        assert_eq!(d.get(), 1.0);
        // Within the custom predicate's tolerance: treated as unchanged, no propagation.
        s.set(1.2);
        assert_eq!(d.get(), 1.0);
        assert_eq!(recomputes.get(), 1);
        // Outside the tolerance: propagates normally.
        s.set(5.0);
        assert_eq!(d.get(), 5.0);
        assert_eq!(recomputes.get(), 2);
    }

    #[test]
    fn derived_by_uses_the_custom_predicate_to_short_circuit_subscribers() {
        let runtime = Runtime::new();
        let grandchild_recomputes = alloc::rc::Rc::new(core::cell::Cell::new(0_u32));
        let s = runtime.signal(0_i32);
        let rounded = {
            let s = s.clone();
            runtime.derived_by(move || s.get() / 10, |a: &i32, b: &i32| a == b)
        };
        let grandchild = {
            let grandchild_recomputes = grandchild_recomputes.clone();
            let rounded = rounded.clone();
            runtime.derived(move || {
                grandchild_recomputes.set(grandchild_recomputes.get() + 1);
                rounded.get() + 1
            })
        };
        assert_eq!(grandchild.get(), 1);
        s.set(1);
        assert_eq!(grandchild.get(), 1, "0/10 == 1/10 under integer division");
        assert_eq!(grandchild_recomputes.get(), 1);
        s.set(20);
        assert_eq!(grandchild.get(), 3);
        assert_eq!(grandchild_recomputes.get(), 2);
    }
}
