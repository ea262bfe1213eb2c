// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scroll generation counter.
//!
//! Background work (preload chains, auto-advance timers) captures the current
//! [`Generation`] when it starts and drops itself once the live value has
//! moved on. The counter is bumped on every real active-index change and on
//! every slide-set rebuild, and never goes backwards.

/// A snapshot of the scroll generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

/// Monotonic scroll generation counter.
#[derive(Debug, Default)]
pub struct ScrollGeneration {
    current: Generation,
}

impl ScrollGeneration {
    /// Creates a counter at generation 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live generation.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Generation {
        self.current
    }

    /// Advances the counter and returns the new generation.
    pub fn bump(&mut self) -> Generation {
        self.current = Generation(self.current.0.wrapping_add(1));
        self.current
    }

    /// Returns `true` if `captured` is still the live generation.
    #[inline]
    #[must_use]
    pub fn is_current(&self, captured: Generation) -> bool {
        self.current == captured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_is_monotonic() {
        let mut g = ScrollGeneration::new();
        let mut last = g.current();
        for _ in 0..5 {
            let next = g.bump();
            assert!(next > last, "generation must strictly increase");
            last = next;
        }
        assert_eq!(g.current(), Generation(5));
    }

    #[test]
    fn captured_generation_goes_stale() {
        let mut g = ScrollGeneration::new();
        let captured = g.bump();
        assert!(g.is_current(captured));
        g.bump();
        assert!(!g.is_current(captured));
    }
}
