// Copyright 2026 the reactive_graph Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Type-erased equality predicates used to short-circuit propagation.
//!
//! Spec §4.1 calls for referential-identity short-circuiting by default,
//! with an opt-in custom predicate per node. A moved-by-value `T` in safe
//! Rust rarely has a meaningful notion of pointer identity, so the default
//! realized here is `PartialEq` comparison (see `DESIGN.md`, Open Question
//! 3); [`EqualityPredicate::custom`] is the opt-in escape hatch for types
//! without a meaningful `PartialEq`, or that want a cheaper comparison.

use alloc::boxed::Box;
use core::any::Any;

pub(crate) struct EqualityPredicate(Box<dyn Fn(&dyn Any, &dyn Any) -> bool>);

impl EqualityPredicate {
    pub(crate) fn by_partial_eq<T: PartialEq + 'static>() -> Self {
        Self(Box::new(|a: &dyn Any, b: &dyn Any| {
            match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }))
    }

    pub(crate) fn custom<T: 'static>(predicate: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self(Box::new(move |a: &dyn Any, b: &dyn Any| {
            match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                (Some(a), Some(b)) => predicate(a, b),
                _ => false,
            }
        }))
    }

    pub(crate) fn eq(&self, a: &dyn Any, b: &dyn Any) -> bool {
        (self.0)(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::EqualityPredicate;

    #[test]
    fn partial_eq_default_compares_values() {
        let predicate = EqualityPredicate::by_partial_eq::<i32>();
        assert!(predicate.eq(&1_i32, &1_i32));
        assert!(!predicate.eq(&1_i32, &2_i32));
    }

    #[test]
    fn custom_predicate_overrides_comparison() {
        let predicate = EqualityPredicate::custom::<f64>(|a, b| (a - b).abs() < 0.5);
        assert!(predicate.eq(&1.0_f64, &1.2_f64));
        assert!(!predicate.eq(&1.0_f64, &2.0_f64));
    }
}
