// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visibility tracking over intersection batches.
//!
//! The platform observes attached slides with a lookahead margin and delivers
//! batches of [`Intersection`] entries. [`VisibilityTracker::observe`] turns a
//! batch into at most one activation candidate plus a list of slides that
//! need their content attached.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use kurbo::Rect;

/// Token identifying one observation context.
///
/// Batches delivered for an older context are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObserverEpoch(pub u64);

/// One entry of an intersection batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// Slide index.
    pub index: usize,
    /// Visible fraction of the slide, in `0.0..=1.0`.
    pub ratio: f64,
    /// Whether the slide intersects the observer's (margin-extended) root.
    pub is_intersecting: bool,
    /// Slide bounds in viewport coordinates.
    pub bounds: Rect,
    /// The physical viewport, without the lookahead margin.
    pub viewport: Rect,
}

impl Intersection {
    /// Returns `true` if the slide overlaps the physical viewport.
    #[must_use]
    pub fn in_viewport(&self) -> bool {
        let overlap = self.bounds.intersect(self.viewport);
        overlap.width() > 0.0 && overlap.height() > 0.0
    }
}

/// What a batch asks the controller to do.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Observation {
    /// Slide that should become active.
    pub activate: Option<usize>,
    /// Slides whose content should be attached, in batch order.
    pub needs_content: Vec<usize>,
}

/// Tracks which slides are observed and interprets intersection batches.
#[derive(Clone, Debug)]
pub struct VisibilityTracker {
    attached: BTreeSet<usize>,
    epoch: ObserverEpoch,
    observing: bool,
    snap_ratio: f64,
}

impl VisibilityTracker {
    /// Creates a tracker that activates slides at or above `snap_ratio`.
    #[must_use]
    pub fn new(snap_ratio: f64) -> Self {
        Self {
            attached: BTreeSet::new(),
            epoch: ObserverEpoch(0),
            observing: true,
            snap_ratio,
        }
    }

    /// The live observation context.
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> ObserverEpoch {
        self.epoch
    }

    /// Returns `true` between [`reattach`](Self::reattach) and
    /// [`detach_all`](Self::detach_all).
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Starts observing a slide. Ignored while detached.
    pub fn attach(&mut self, index: usize) -> bool {
        self.observing && self.attached.insert(index)
    }

    /// Returns `true` if the slide is observed.
    #[must_use]
    pub fn is_attached(&self, index: usize) -> bool {
        self.attached.contains(&index)
    }

    /// Stops observing every slide.
    pub fn detach_all(&mut self) {
        self.attached.clear();
        self.observing = false;
    }

    /// Opens a fresh observation context and returns its epoch.
    pub fn reattach(&mut self) -> ObserverEpoch {
        self.attached.clear();
        self.epoch = ObserverEpoch(self.epoch.0.wrapping_add(1));
        self.observing = true;
        self.epoch
    }

    /// Interprets one intersection batch.
    ///
    /// Among intersecting, attached entries the highest ratio is the
    /// activation candidate; it only wins at or above the snap ratio.
    /// Unpopulated slides need content once they overlap the viewport, or as
    /// soon as they intersect the margin when `preload_distance > 0`.
    pub fn observe(
        &self,
        epoch: ObserverEpoch,
        batch: &[Intersection],
        preload_distance: u32,
        is_populated: impl Fn(usize) -> bool,
    ) -> Observation {
        let mut observation = Observation::default();
        if !self.observing || epoch != self.epoch {
            return observation;
        }

        let mut best: Option<(usize, f64)> = None;
        for entry in batch
            .iter()
            .filter(|e| e.is_intersecting && self.attached.contains(&e.index))
        {
            if best.is_none_or(|(_, ratio)| entry.ratio > ratio) {
                best = Some((entry.index, entry.ratio));
            }
            if !is_populated(entry.index)
                && (preload_distance > 0 || entry.in_viewport())
                && !observation.needs_content.contains(&entry.index)
            {
                observation.needs_content.push(entry.index);
            }
        }

        observation.activate = best
            .filter(|&(_, ratio)| ratio >= self.snap_ratio)
            .map(|(index, _)| index);
        observation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Rect = Rect::new(0.0, 0.0, 400.0, 800.0);

    /// Entry for a full-height slide whose top edge sits at `top`.
    fn entry(index: usize, ratio: f64, top: f64) -> Intersection {
        Intersection {
            index,
            ratio,
            is_intersecting: ratio > 0.0 || top < 2.0 * VIEWPORT.height(),
            bounds: Rect::new(0.0, top, 400.0, top + 800.0),
            viewport: VIEWPORT,
        }
    }

    fn tracker(slides: usize) -> VisibilityTracker {
        let mut t = VisibilityTracker::new(0.5);
        for i in 0..slides {
            t.attach(i);
        }
        t
    }

    #[test]
    fn highest_ratio_wins_above_snap() {
        let t = tracker(3);
        let obs = t.observe(
            t.epoch(),
            &[entry(0, 0.3, -560.0), entry(1, 0.7, 240.0)],
            0,
            |_| true,
        );
        assert_eq!(obs.activate, Some(1));
    }

    #[test]
    fn below_snap_keeps_previous() {
        let t = tracker(3);
        let obs = t.observe(
            t.epoch(),
            &[entry(0, 0.45, -440.0), entry(1, 0.45, 440.0)],
            0,
            |_| true,
        );
        assert_eq!(obs.activate, None);
    }

    #[test]
    fn margin_entries_wait_for_viewport_without_lookahead() {
        let t = tracker(3);
        // Slide 2 sits entirely below the viewport, inside the margin.
        let batch = [entry(1, 1.0, 0.0), entry(2, 0.0, 800.0)];
        let obs = t.observe(t.epoch(), &batch, 0, |_| false);
        assert_eq!(obs.needs_content, [1]);

        let obs = t.observe(t.epoch(), &batch, 2, |_| false);
        assert_eq!(obs.needs_content, [1, 2]);
    }

    #[test]
    fn populated_slides_need_nothing() {
        let t = tracker(2);
        let obs = t.observe(t.epoch(), &[entry(0, 1.0, 0.0)], 0, |i| i == 0);
        assert!(obs.needs_content.is_empty());
        assert_eq!(obs.activate, Some(0));
    }

    #[test]
    fn unattached_and_stale_batches_are_ignored() {
        let mut t = VisibilityTracker::new(0.5);
        t.attach(0);
        let obs = t.observe(t.epoch(), &[entry(5, 1.0, 0.0)], 0, |_| false);
        assert_eq!(obs, Observation::default(), "slide 5 was never attached");

        let old = t.epoch();
        t.detach_all();
        assert!(!t.attach(0), "attach is ignored while detached");
        let fresh = t.reattach();
        assert_ne!(old, fresh);
        t.attach(0);
        let obs = t.observe(old, &[entry(0, 1.0, 0.0)], 0, |_| false);
        assert_eq!(obs, Observation::default(), "old context is dead");
        let obs = t.observe(fresh, &[entry(0, 1.0, 0.0)], 0, |_| false);
        assert_eq!(obs.activate, Some(0));
    }
}
