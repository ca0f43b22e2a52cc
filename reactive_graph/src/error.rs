// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error kinds raised by the graph (spec §7).

use alloc::string::String;
use core::fmt;

/// Errors the graph itself can raise.
///
/// Per spec §7 policy, the graph is left in a consistent state after any of
/// these: batch depth and the current-consumer slot are always restored by
/// scope guards (see [`crate::tracker::track`]), regardless of which branch
/// below produced the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A derived node was re-entered while it was already being recomputed.
    /// Fatal to the triggering read; the node's status remains `COMPUTING`
    /// on no other node (only the re-entered node is involved), and its own
    /// state is left `Pending` so a later, non-cyclic read can retry.
    CycleDetected,
    /// The compute function of a derived node returned an error. The node's
    /// status remains `Dirty` so the next read retries; dependencies tracked
    /// before the error are still pruned against (the scope guard in
    /// [`crate::tracker::track`] runs regardless of the closure's outcome).
    ComputeError(String),
    /// An effect's run function returned an error. The error is reported via
    /// [`crate::instrument::Hooks::on_effect_error`]; the effect's `SCHEDULED`
    /// flag is cleared so a future invalidation re-enqueues it, and any
    /// cleanup from the effect's *previous* run still executes.
    EffectError(String),
    /// A producer-subscribed listener callback returned an error. Isolated:
    /// the producer continues notifying its remaining listeners.
    ListenerError(String),
    /// Attempted a fallible write against a node that has already been
    /// disposed (spec §4.8), e.g. via [`crate::handle::SignalHandle::try_set`].
    DisposedUse,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycleDetected => write!(f, "cycle detected while settling a derived node"),
            Self::ComputeError(message) => write!(f, "derived compute failed: {message}"),
            Self::EffectError(message) => write!(f, "effect run failed: {message}"),
            Self::ListenerError(message) => write!(f, "listener callback failed: {message}"),
            Self::DisposedUse => write!(f, "cannot write to a disposed node"),
        }
    }
}

impl core::error::Error for GraphError {}

#[cfg(test)]
mod tests {
    use super::GraphError;
    use alloc::string::ToString;

    #[test]
    fn display_mentions_the_kind() {
        assert!(GraphError::CycleDetected.to_string().contains("cycle"));
        assert!(GraphError::DisposedUse.to_string().contains("disposed"));
    }
}
