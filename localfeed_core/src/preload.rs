// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Staggered neighbour preloading.
//!
//! Every real change of the active slide starts a [`PreloadChain`]: a record
//! that walks outward from the new active slide one step per wake, up to a
//! maximum distance. Each chain captures the [`Generation`] it was started
//! under; the first step taken after the live generation has moved on ends
//! the chain without touching anything.
//!
//! The scheduler only decides *which* index a step visits. Whether that
//! index exists, is already populated, or deserves eager treatment is the
//! controller's call.

use alloc::vec::Vec;
use core::time::Duration;

use crate::generation::Generation;
use crate::wake::{PendingWake, Wake};

/// Identity of a preload chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChainId(pub u64);

/// Which way a chain walks from its center.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward higher indices.
    Ahead,
    /// Toward lower indices.
    Behind,
}

impl Direction {
    /// Scroll direction of a move from `from` to `to`.
    ///
    /// The first activation (no previous slide) counts as moving ahead.
    #[must_use]
    pub const fn of_move(from: Option<usize>, to: usize) -> Self {
        match from {
            Some(from) if to < from => Self::Behind,
            _ => Self::Ahead,
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Ahead => Self::Behind,
            Self::Behind => Self::Ahead,
        }
    }
}

/// What happened at one chain step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// A load was started for the target.
    Triggered,
    /// The target already had content.
    Populated,
    /// The target index does not exist; the step was consumed anyway.
    OutOfRange,
    /// The generation moved on; the chain ended.
    Stale,
}

/// A live preload chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreloadChain {
    /// Chain identity.
    pub id: ChainId,
    /// Generation captured at start.
    pub generation: Generation,
    /// Index the chain walks away from.
    pub center: usize,
    /// Number of steps to take.
    pub max_distance: usize,
    /// Walking direction.
    pub direction: Direction,
    /// `true` for the chain in the scroll direction.
    pub lead: bool,
    /// Next step to take, starting at 1.
    pub step: usize,
}

impl PreloadChain {
    /// Index visited by the next step, or `None` if it would fall below 0.
    #[must_use]
    pub fn target(&self) -> Option<usize> {
        match self.direction {
            Direction::Ahead => self.center.checked_add(self.step),
            Direction::Behind => self.center.checked_sub(self.step),
        }
    }
}

/// One step taken by [`PreloadScheduler::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainStep {
    /// Chain identity.
    pub chain: ChainId,
    /// Generation captured by the chain.
    pub generation: Generation,
    /// Step number, starting at 1.
    pub step: usize,
    /// Walking direction.
    pub direction: Direction,
    /// `true` for the chain in the scroll direction.
    pub lead: bool,
    /// Index to visit; `None` past the start of the feed or when stale.
    pub target: Option<usize>,
    /// `true` if the chain ended because its generation is no longer live.
    pub stale: bool,
    /// Wake for the following step, if any.
    pub next: Option<PendingWake>,
}

/// Owns the live preload chains.
#[derive(Debug)]
pub struct PreloadScheduler {
    chains: Vec<PreloadChain>,
    next_id: u64,
    step_delay: Duration,
}

impl PreloadScheduler {
    /// Creates a scheduler with the given inter-step delay.
    #[must_use]
    pub fn new(step_delay: Duration) -> Self {
        Self {
            chains: Vec::new(),
            next_id: 0,
            step_delay,
        }
    }

    /// Number of chains still waiting for a step.
    #[must_use]
    pub fn live_chains(&self) -> usize {
        self.chains.len()
    }

    /// Starts a chain. Returns the wake for its first step, or `None` when
    /// `max_distance` is 0.
    ///
    /// The first step is due one step delay after scheduling.
    pub fn schedule(
        &mut self,
        center: usize,
        max_distance: usize,
        direction: Direction,
        lead: bool,
        generation: Generation,
    ) -> Option<PendingWake> {
        if max_distance == 0 {
            return None;
        }
        let id = ChainId(self.next_id);
        self.next_id += 1;
        self.chains.push(PreloadChain {
            id,
            generation,
            center,
            max_distance,
            direction,
            lead,
            step: 1,
        });
        Some(PendingWake::new(Wake::PreloadStep(id), self.step_delay))
    }

    /// Takes the next step of chain `id` against the `live` generation.
    ///
    /// Returns `None` for chains that have already ended.
    pub fn advance(&mut self, id: ChainId, live: Generation) -> Option<ChainStep> {
        let pos = self.chains.iter().position(|c| c.id == id)?;
        let chain = &mut self.chains[pos];
        let mut step = ChainStep {
            chain: id,
            generation: chain.generation,
            step: chain.step,
            direction: chain.direction,
            lead: chain.lead,
            target: None,
            stale: false,
            next: None,
        };

        if chain.generation != live {
            step.stale = true;
            self.chains.swap_remove(pos);
            return Some(step);
        }

        step.target = chain.target();
        chain.step += 1;
        if chain.step > chain.max_distance {
            self.chains.swap_remove(pos);
        } else {
            step.next = Some(PendingWake::new(Wake::PreloadStep(id), self.step_delay));
        }
        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_id(wake: Option<PendingWake>) -> ChainId {
        match wake.map(|w| w.wake) {
            Some(Wake::PreloadStep(id)) => id,
            other => panic!("expected a preload step wake, got {other:?}"),
        }
    }

    #[test]
    fn walks_ahead_then_ends() {
        let mut s = PreloadScheduler::new(Duration::from_millis(150));
        let g = Generation(1);
        let id = first_id(s.schedule(5, 3, Direction::Ahead, true, g));

        let targets: Vec<_> = (0..3)
            .map(|_| s.advance(id, g).unwrap())
            .map(|step| (step.step, step.target, step.next.is_some()))
            .collect();
        assert_eq!(
            targets,
            [(1, Some(6), true), (2, Some(7), true), (3, Some(8), false)]
        );
        assert_eq!(s.live_chains(), 0);
        assert!(s.advance(id, g).is_none(), "ended chains do not step");
    }

    #[test]
    fn behind_stops_at_zero() {
        let mut s = PreloadScheduler::new(Duration::from_millis(150));
        let g = Generation(1);
        let id = first_id(s.schedule(1, 3, Direction::Behind, false, g));
        assert_eq!(s.advance(id, g).unwrap().target, Some(0));
        let step = s.advance(id, g).unwrap();
        assert_eq!(step.target, None, "index -1 is out of range");
        assert!(step.next.is_some(), "out-of-range steps still consume a step");
    }

    #[test]
    fn stale_generation_ends_chain() {
        let mut s = PreloadScheduler::new(Duration::from_millis(150));
        let id = first_id(s.schedule(2, 3, Direction::Ahead, true, Generation(1)));
        assert_eq!(s.advance(id, Generation(1)).unwrap().target, Some(3));

        let step = s.advance(id, Generation(2)).unwrap();
        assert!(step.stale);
        assert_eq!(step.target, None);
        assert_eq!(step.next, None);
        assert_eq!(s.live_chains(), 0);
    }

    #[test]
    fn zero_distance_schedules_nothing() {
        let mut s = PreloadScheduler::new(Duration::from_millis(150));
        assert!(s.schedule(0, 0, Direction::Ahead, true, Generation(0)).is_none());
        assert_eq!(s.live_chains(), 0);
    }

    #[test]
    fn direction_of_move() {
        assert_eq!(Direction::of_move(None, 0), Direction::Ahead);
        assert_eq!(Direction::of_move(Some(3), 4), Direction::Ahead);
        assert_eq!(Direction::of_move(Some(3), 1), Direction::Behind);
        assert_eq!(Direction::Ahead.reverse(), Direction::Behind);
    }
}
