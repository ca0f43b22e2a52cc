// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A fine-grained, push-invalidate/pull-recompute reactive dataflow graph.
//!
//! Three node kinds make up the graph (spec §3): [`handle::SignalHandle`]
//! (pure producers), derived nodes behind [`handle::DerivedHandle`]
//! (producer+consumer hybrids, lazily recomputed and cached), and
//! [`handle::EffectHandle`] (pure consumers, run for their side effects).
//! Writing a signal pushes invalidation through the dependency graph
//! immediately; reading a derived node pulls a recompute only as far up the
//! graph as is actually needed, and only when something might really have
//! changed (spec §4.5, §4.6 — this is what keeps the graph glitch-free
//! without recomputing everything on every write).
//!
//! Everything is reached through a [`runtime::Runtime`], which owns the
//! graph's storage and is not implicitly global (spec §9): multiple
//! runtimes are fully independent of one another.
//!
//! ```
//! use reactive_graph::Runtime;
//!
//! let runtime = Runtime::new();
//! let count = runtime.signal(0_i32);
//! let doubled = {
//!     let count = count.clone();
//!     runtime.derived(move || count.get() * 2)
//! };
//! assert_eq!(doubled.get(), 0);
//! count.set(5);
//! assert_eq!(doubled.get(), 10);
//! ```

#![no_std]

extern crate alloc;

mod arena;
mod context;
mod edge;
mod equality;
mod error;
mod handle;
mod id;
mod instrument;
mod node;
mod propagate;
mod pull;
mod runtime;
mod scheduler;
mod status;
mod tracker;

pub use error::GraphError;
pub use handle::{DerivedHandle, EffectHandle, SignalHandle};
pub use id::NodeId;
pub use instrument::{Hooks, NoopHooks, RuntimeStats};
pub use node::{Cleanup, FlushStrategy, SyncStrategy};
pub use runtime::{CyclePolicy, Runtime, RuntimeOptions};
