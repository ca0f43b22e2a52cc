// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node representation: the tagged Signal/Derived/Effect variants (spec §3).
//!
//! A single struct, `Node`, carries the fields common to every kind (status,
//! the two intrusive list head/tails, tracking version) plus a `Payload`
//! enum holding the kind-specific pieces. This is the tagged-variant
//! dispatch spec §9 recommends over virtual dispatch: `Status`'s TYPE bits
//! and `Payload`'s discriminant always agree, checked once at construction.

use alloc::boxed::Box;
use core::any::Any;

use crate::equality::EqualityPredicate;
use crate::error::GraphError;
use crate::id::EdgeId;
use crate::runtime::Runtime;
use crate::status::{NodeState, Status};

/// A cleanup function registered by an effect's last run.
pub type Cleanup = Box<dyn FnOnce()>;

/// A type-erased, fallible compute function producing a boxed value.
pub(crate) type BoxedCompute = Box<dyn FnMut(&Runtime) -> Result<Box<dyn Any>, GraphError>>;

/// A type-erased, fallible effect body.
pub(crate) type BoxedRun = Box<dyn FnMut(&Runtime) -> Result<Option<Cleanup>, GraphError>>;

/// Delegates *when* a settled effect body actually runs (spec §4.7, §6).
///
/// `schedule` receives a single-shot closure that performs the tracked
/// evaluation; the strategy decides when (or whether) to invoke it. The
/// default, synchronous strategy invokes it immediately.
pub trait FlushStrategy {
    /// Schedules `run` to execute at a time of the strategy's choosing.
    /// Implementations that defer `run` must check the effect has not been
    /// disposed in the meantime before invoking it.
    fn schedule(&self, run: Box<dyn FnOnce()>);
}

/// Runs the closure immediately, synchronously. The core's default strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncStrategy;

impl FlushStrategy for SyncStrategy {
    fn schedule(&self, run: Box<dyn FnOnce()>) {
        run();
    }
}

pub(crate) enum Payload {
    Signal {
        value: Box<dyn Any>,
        eq: EqualityPredicate,
    },
    Derived {
        value: Option<Box<dyn Any>>,
        compute: BoxedCompute,
        eq: EqualityPredicate,
    },
    Effect {
        run: BoxedRun,
        cleanup: Option<Cleanup>,
        strategy: alloc::rc::Rc<dyn FlushStrategy>,
    },
}

pub(crate) struct Node {
    pub(crate) status: Status,
    pub(crate) state: NodeState,
    pub(crate) subscribers_head: Option<EdgeId>,
    pub(crate) subscribers_tail: Option<EdgeId>,
    pub(crate) dependencies_head: Option<EdgeId>,
    pub(crate) dependencies_tail: Option<EdgeId>,
    /// Incremented every time `track(self, f)` begins; used to detect and
    /// prune stale dependency edges (spec §3 invariant 4, §4.4).
    pub(crate) tracking_version: u32,
    pub(crate) payload: Payload,
}

impl Node {
    pub(crate) fn signal(value: Box<dyn Any>, eq: EqualityPredicate) -> Self {
        Self {
            status: Status::SIGNAL,
            state: NodeState::Clean,
            subscribers_head: None,
            subscribers_tail: None,
            dependencies_head: None,
            dependencies_tail: None,
            tracking_version: 0,
            payload: Payload::Signal { value, eq },
        }
    }

    pub(crate) fn derived(compute: BoxedCompute, eq: EqualityPredicate) -> Self {
        Self {
            status: Status::DERIVED,
            state: NodeState::Dirty,
            subscribers_head: None,
            subscribers_tail: None,
            dependencies_head: None,
            dependencies_tail: None,
            tracking_version: 0,
            payload: Payload::Derived {
                value: None,
                compute,
                eq,
            },
        }
    }

    pub(crate) fn effect(run: BoxedRun, strategy: alloc::rc::Rc<dyn FlushStrategy>) -> Self {
        Self {
            status: Status::EFFECT,
            state: NodeState::Clean,
            subscribers_head: None,
            subscribers_tail: None,
            dependencies_head: None,
            dependencies_tail: None,
            tracking_version: 0,
            payload: Payload::Effect {
                run,
                cleanup: None,
                strategy,
            },
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.status.contains(Status::DISPOSED)
    }

    pub(crate) fn is_derived(&self) -> bool {
        self.status.contains(Status::DERIVED)
    }

    pub(crate) fn is_effect(&self) -> bool {
        self.status.contains(Status::EFFECT)
    }
}
