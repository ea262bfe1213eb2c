// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Virtual-time driver for a [`FeedController`].
//!
//! [`Runner`] plays the platform's part: it lays slides out in a vertical
//! column, turns scroll offsets into intersection batches the way a pair of
//! browser observers would (one on the viewport, one on the lookahead band,
//! each reporting only slides that crossed a threshold), finishes
//! transfers after a configurable latency, advances video and carrier
//! clocks, and fires requested wakes when they fall due. Every trace event is
//! recorded with the virtual time at which it happened.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Duration;

use kurbo::Rect;

use localfeed_core::audio::CarrierId;
use localfeed_core::config::FeedConfig;
use localfeed_core::controller::{FeedController, FeedEvent};
use localfeed_core::visibility::Intersection;
use localfeed_core::wake::{PendingWake, Wake};
use localfeed_debug::recorder::{Recorded, Recorder, TraceEvent};

use crate::carrier::SimCarrier;
use crate::surface::SimSurface;

/// Viewport width in simulated pixels.
pub const VIEWPORT_WIDTH: f64 = 450.0;
/// Viewport (and slide) height in simulated pixels.
pub const VIEWPORT_HEIGHT: f64 = 800.0;

/// Origin the simulated page is served from.
pub const ORIGIN: &str = "http://feed.local";

/// Transfer latency used when a slide has no override.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(40);

/// The controller type a [`Runner`] drives.
pub type SimController = FeedController<SimSurface, SimCarrier>;

/// Thresholds of the viewport observer, before the snap ratio is added.
const VIEWPORT_THRESHOLDS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// An intersection observer over the slide column.
///
/// Like the browser's, it reports a slide only when its intersecting state
/// or threshold band against the (possibly extended) root changed since the
/// previous report. Every slide reports once after a reset.
#[derive(Clone, Debug)]
struct SimObserver {
    margin: f64,
    thresholds: Vec<f64>,
    reported: BTreeMap<usize, (bool, usize)>,
}

impl SimObserver {
    fn new(margin: f64, mut thresholds: Vec<f64>) -> Self {
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();
        Self {
            margin,
            thresholds,
            reported: BTreeMap::new(),
        }
    }

    fn reset(&mut self) {
        self.reported.clear();
    }

    /// Entries for the slides that crossed a threshold at `scroll`.
    fn take_changes(&mut self, slides: usize, scroll: f64) -> Vec<Intersection> {
        let viewport = Rect::new(0.0, 0.0, VIEWPORT_WIDTH, VIEWPORT_HEIGHT);
        let root = viewport.inflate(0.0, self.margin);
        let mut changes = Vec::new();
        for index in 0..slides {
            let top = index as f64 * VIEWPORT_HEIGHT - scroll;
            let bounds = Rect::new(0.0, top, VIEWPORT_WIDTH, top + VIEWPORT_HEIGHT);
            let in_root = bounds.intersect(root);
            let is_intersecting = in_root.width() > 0.0 && in_root.height() > 0.0;
            let root_ratio = if is_intersecting {
                in_root.area() / bounds.area()
            } else {
                0.0
            };
            let band = if is_intersecting {
                self.thresholds.iter().filter(|&&t| root_ratio >= t).count()
            } else {
                0
            };
            let state = (is_intersecting, band);
            if self.reported.insert(index, state) == Some(state) {
                continue;
            }
            changes.push(Intersection {
                index,
                ratio: bounds.intersect(viewport).area() / bounds.area(),
                is_intersecting,
                bounds,
                viewport,
            });
        }
        changes
    }
}

#[derive(Clone, Copy, Debug)]
enum Scheduled {
    Wake(Wake),
    Settle { index: usize, serial: u64 },
}

/// Drives a [`SimController`] on a virtual clock.
pub struct Runner {
    controller: SimController,
    now: Duration,
    queue: BTreeMap<(Duration, u64), Scheduled>,
    seq: u64,
    latency: Duration,
    overrides: BTreeMap<usize, Duration>,
    failing: BTreeSet<usize>,
    scroll: f64,
    visible: SimObserver,
    lookahead: Option<SimObserver>,
    events: Rc<RefCell<Vec<FeedEvent>>>,
    recorder: Recorder,
    carriers: Option<[SimCarrier; 2]>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("now", &self.now)
            .field("scroll", &self.scroll)
            .field("queued", &self.queue.len())
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Creates a runner over a feed of `media_ids`, every slide attached.
    ///
    /// Nothing is active until the first [`scroll_to`](Self::scroll_to) or
    /// [`activate`](Self::activate).
    #[must_use]
    pub fn new<T: AsRef<str>>(config: FeedConfig, media_ids: &[T]) -> Self {
        let mut controller = FeedController::new(config, SimSurface::new(), ORIGIN);
        let recorder = Recorder::new();
        controller.set_trace_sink(Box::new(recorder.sink()));
        let events = Rc::new(RefCell::new(Vec::new()));
        let listener = Rc::clone(&events);
        controller.set_listener(move |e| listener.borrow_mut().push(e));

        let mut thresholds = VIEWPORT_THRESHOLDS.to_vec();
        thresholds.push(config.snap_ratio);
        let visible = SimObserver::new(0.0, thresholds);
        let lookahead = (config.preload_distance > 0).then(|| {
            SimObserver::new(f64::from(config.preload_distance) * VIEWPORT_HEIGHT, vec![0.0])
        });

        let mut runner = Self {
            controller,
            now: Duration::ZERO,
            queue: BTreeMap::new(),
            seq: 0,
            latency: DEFAULT_LATENCY,
            overrides: BTreeMap::new(),
            failing: BTreeSet::new(),
            scroll: 0.0,
            visible,
            lookahead,
            events,
            recorder,
            carriers: None,
        };
        runner.rebuild(media_ids);
        runner
    }

    // -- configuration ------------------------------------------------------

    /// Sets the transfer latency for slides without an override.
    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = latency;
    }

    /// Sets the transfer latency of one slide.
    pub fn set_slide_latency(&mut self, index: usize, latency: Duration) {
        self.overrides.insert(index, latency);
    }

    /// Makes every transfer of slide `index` end in an error.
    pub fn fail_slide(&mut self, index: usize) {
        self.failing.insert(index);
    }

    // -- queries ------------------------------------------------------------

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// The driven controller.
    #[must_use]
    pub fn controller(&self) -> &SimController {
        &self.controller
    }

    /// The simulated surface.
    #[must_use]
    pub fn surface(&self) -> &SimSurface {
        self.controller.surface()
    }

    /// Mutable access to the simulated surface.
    pub fn surface_mut(&mut self) -> &mut SimSurface {
        self.controller.surface_mut()
    }

    /// Handle to the carrier with `id`, once audio is unlocked.
    #[must_use]
    pub fn carrier(&self, id: CarrierId) -> Option<&SimCarrier> {
        self.carriers.as_ref()?.get(usize::from(id.0))
    }

    /// Handle to whichever carrier currently holds the primary role.
    #[must_use]
    pub fn primary(&self) -> Option<&SimCarrier> {
        let id = self.controller.audio().carriers()?.primary().id();
        self.carrier(id)
    }

    /// Handle to whichever carrier currently holds the standby role.
    #[must_use]
    pub fn standby(&self) -> Option<&SimCarrier> {
        let id = self.controller.audio().carriers()?.standby().id();
        self.carrier(id)
    }

    /// Notifications delivered so far.
    #[must_use]
    pub fn events(&self) -> Vec<FeedEvent> {
        self.events.borrow().clone()
    }

    /// Trace events recorded so far.
    #[must_use]
    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorder.events()
    }

    /// Recorded trace events that satisfy `f`.
    pub fn trace_where(&self, f: impl Fn(&TraceEvent) -> bool) -> Vec<TraceEvent> {
        self.recorder
            .events()
            .into_iter()
            .map(|r| r.event)
            .filter(|e| f(e))
            .collect()
    }

    /// The recorder backing [`recorded`](Self::recorded).
    #[must_use]
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    // -- platform events ----------------------------------------------------

    /// Replaces the feed, attaches every new slide and scrolls to the top.
    pub fn rebuild<T: AsRef<str>>(&mut self, media_ids: &[T]) {
        self.controller
            .rebuild(media_ids.iter().map(|id| String::from(id.as_ref())));
        for index in 0..media_ids.len() {
            self.controller.attach(index);
        }
        self.scroll = 0.0;
        self.visible.reset();
        if let Some(lookahead) = &mut self.lookahead {
            lookahead.reset();
        }
        self.pump();
    }

    /// Scrolls so slide `index` fills the viewport.
    pub fn scroll_to(&mut self, index: usize) {
        let offset = index as f64 * VIEWPORT_HEIGHT;
        self.scroll_to_offset(offset);
    }

    /// Scrolls to `offset` pixels from the top and delivers whatever
    /// batches the observers produce, viewport first.
    pub fn scroll_to_offset(&mut self, offset: f64) {
        self.scroll = offset;
        let slides = self.controller.registry().len();
        let epoch = self.controller.observer_epoch();
        let mut batches = vec![self.visible.take_changes(slides, offset)];
        if let Some(lookahead) = &mut self.lookahead {
            batches.push(lookahead.take_changes(slides, offset));
        }
        for batch in batches.iter().filter(|b| !b.is_empty()) {
            self.controller.observe(epoch, batch);
        }
        self.pump();
    }

    /// Activates `index` directly, as a programmatic jump would.
    pub fn activate(&mut self, index: usize) -> bool {
        let ok = self.controller.activate_index(index);
        self.pump();
        ok
    }

    /// Simulates the first user gesture: creates and hands over both
    /// carriers, then turns audio on.
    pub fn unlock_audio(&mut self) {
        let primary = SimCarrier::new();
        let standby = SimCarrier::new();
        self.carriers = Some([primary.clone(), standby.clone()]);
        self.controller.unlock_audio(primary, standby);
        self.controller.enable_audio();
        self.pump();
    }

    /// Marks carrier `id` as buffered and reports it.
    pub fn carrier_ready(&mut self, id: CarrierId) {
        if let Some(c) = self.carrier(id) {
            c.state_mut().ready = true;
        }
        self.controller.carrier_ready(id);
        self.pump();
    }

    /// Reports a carrier element error.
    pub fn carrier_failed(&mut self, id: CarrierId) {
        self.controller.carrier_failed(id);
        self.pump();
    }

    /// Reports that the video at `index` reached its end.
    pub fn video_ended(&mut self, index: usize) {
        self.controller.video_ended(index);
        self.pump();
    }

    /// Runs `f` against the controller and then schedules whatever it
    /// requested.
    pub fn with_controller<R>(&mut self, f: impl FnOnce(&mut SimController) -> R) -> R {
        let r = f(&mut self.controller);
        self.pump();
        r
    }

    // -- time ---------------------------------------------------------------

    /// Moves virtual time forward by `dt`, delivering everything that falls
    /// due in order.
    pub fn advance(&mut self, dt: Duration) {
        let target = self.now + dt;
        while let Some(entry) = self.queue.first_entry() {
            let (at, _) = *entry.key();
            if at > target {
                break;
            }
            let item = entry.remove();
            self.move_clock(at);
            self.deliver(item);
            self.pump();
        }
        self.move_clock(target);
    }

    /// Number of queued wakes and transfer completions.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    // -- internals ----------------------------------------------------------

    fn move_clock(&mut self, to: Duration) {
        let dt = to.saturating_sub(self.now);
        if !dt.is_zero() {
            self.controller.surface_mut().advance_clocks(dt);
            if let Some(carriers) = &self.carriers {
                for c in carriers {
                    c.advance(dt);
                }
            }
        }
        self.now = to;
        self.recorder.set_now(to);
    }

    fn deliver(&mut self, item: Scheduled) {
        match item {
            Scheduled::Wake(wake) => self.controller.wake(wake),
            Scheduled::Settle { index, serial } => {
                let surface = self.controller.surface_mut();
                if !surface.is_pending(index, serial) {
                    return;
                }
                if self.failing.contains(&index) {
                    surface.fail(index);
                    self.controller.content_failed(index);
                } else {
                    surface.complete(index);
                    self.controller.content_loaded(index);
                }
            }
        }
    }

    /// Queues the wakes and transfers requested since the last pump.
    fn pump(&mut self) {
        for PendingWake { wake, after } in self.controller.take_wakes() {
            self.enqueue(self.now + after, Scheduled::Wake(wake));
        }
        for (index, serial) in self.controller.surface_mut().take_started() {
            let latency = self.overrides.get(&index).copied().unwrap_or(self.latency);
            self.enqueue(self.now + latency, Scheduled::Settle { index, serial });
        }
    }

    fn enqueue(&mut self, at: Duration, item: Scheduled) {
        self.queue.insert((at, self.seq), item);
        self.seq += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localfeed_core::slide::LoadState;

    #[test]
    fn scroll_activates_and_completes_transfer() {
        let mut r = Runner::new(FeedConfig::standard(), &["a.jpg", "b.jpg"]);
        r.scroll_to(0);
        assert_eq!(r.controller().active_index(), Some(0));
        assert_eq!(r.controller().registry().state(0), Some(LoadState::Loading));

        r.advance(DEFAULT_LATENCY);
        assert_eq!(r.controller().registry().state(0), Some(LoadState::Loaded));
        assert_eq!(r.now(), DEFAULT_LATENCY);
    }

    #[test]
    fn observers_report_only_crossings() {
        let mut lookahead = SimObserver::new(VIEWPORT_HEIGHT, vec![0.0]);
        let first = lookahead.take_changes(6, 2.0 * VIEWPORT_HEIGHT);
        assert_eq!(first.len(), 6, "every slide reports once");
        let intersecting: Vec<_> = first
            .iter()
            .filter(|e| e.is_intersecting)
            .map(|e| e.index)
            .collect();
        assert_eq!(intersecting, [1, 2, 3]);
        let full: Vec<_> = first
            .iter()
            .filter(|e| e.ratio == 1.0)
            .map(|e| e.index)
            .collect();
        assert_eq!(full, [2], "ratios are against the physical viewport");
        assert!(lookahead.take_changes(6, 2.0 * VIEWPORT_HEIGHT).is_empty());

        // One slide down: 1 leaves the band and 4 enters it. Slides 2 and 3
        // stay fully inside the extended root, so they are not reported.
        let moved: Vec<_> = lookahead
            .take_changes(6, 3.0 * VIEWPORT_HEIGHT)
            .iter()
            .map(|e| (e.index, e.is_intersecting))
            .collect();
        assert_eq!(moved, [(1, false), (4, true)]);

        let mut visible = SimObserver::new(0.0, VIEWPORT_THRESHOLDS.to_vec());
        let _ = visible.take_changes(6, 0.0);
        let scrolled: Vec<_> = visible
            .take_changes(6, 0.3 * VIEWPORT_HEIGHT)
            .iter()
            .map(|e| e.index)
            .collect();
        assert_eq!(scrolled, [0, 1]);
        assert!(visible.take_changes(6, 0.35 * VIEWPORT_HEIGHT).is_empty());
    }

    #[test]
    fn failing_slide_reports_error() {
        let mut r = Runner::new(FeedConfig::standard(), &["a.jpg"]);
        r.fail_slide(0);
        r.scroll_to(0);
        r.advance(Duration::from_millis(100));
        assert_eq!(r.controller().registry().state(0), Some(LoadState::Errored));
        assert!(r.surface().element(0).unwrap().error_shown);
    }
}
