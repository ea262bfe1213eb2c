// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The feed controller.
//!
//! [`FeedController`] owns the slide registry, the visibility tracker, the
//! scroll generation, the preload scheduler and the audio engine, and drives a
//! [`MediaSurface`] in response to platform events. One controller exists per
//! feed session; everything it does runs on the caller's thread.
//!
//! # Event entry points
//!
//! | Platform event                  | Method                                    |
//! |---------------------------------|-------------------------------------------|
//! | slide set replaced              | [`rebuild`](FeedController::rebuild)      |
//! | slide element created           | [`attach`](FeedController::attach)        |
//! | intersection batch              | [`observe`](FeedController::observe)      |
//! | element `load` / `loadeddata`   | [`content_loaded`](FeedController::content_loaded) |
//! | element `error`                 | [`content_failed`](FeedController::content_failed) |
//! | video `ended`                   | [`video_ended`](FeedController::video_ended) |
//! | first user gesture              | [`unlock_audio`](FeedController::unlock_audio) |
//! | carrier `canplay` / `error`     | [`carrier_ready`](FeedController::carrier_ready), [`carrier_failed`](FeedController::carrier_failed) |
//! | timer due                       | [`wake`](FeedController::wake)            |
//!
//! After every call, drain [`take_wakes`](FeedController::take_wakes) and
//! schedule the returned wakes.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::audio::{AudioCarrier, AudioSync, CarrierId, PreloadOutcome, SyncEpoch};
use crate::config::FeedConfig;
use crate::generation::{Generation, ScrollGeneration};
use crate::media::MediaKind;
use crate::preload::{ChainId, Direction, PreloadScheduler, StepOutcome};
use crate::slide::{LoadState, SlideRegistry};
use crate::surface::{Buffering, LoadPriority, MediaSurface, Transfer};
use crate::trace::{
    ActivateEvent, AudioAttachEvent, AudioFailureEvent, AudioPreloadEvent, DeactivateEvent,
    DriftEvent, GenerationCause, GenerationEvent, LoadEvent, LoadOutcome, LoadSettledEvent,
    LoadTrigger, PlaybackRejectedEvent, PreloadStepEvent, SlowLoadEvent, Teardown, TraceSink,
    Tracer,
};
use crate::visibility::{Intersection, ObserverEpoch, VisibilityTracker};
use crate::wake::{PendingWake, Wake};

/// Notification delivered to the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeedEvent {
    /// The active slide changed (including the first activation).
    ActiveChanged {
        /// New active index.
        index: usize,
    },
    /// Auto-advance wants the application to scroll to `to`.
    AdvanceRequested {
        /// Currently active index.
        from: usize,
        /// Index to scroll to.
        to: usize,
    },
}

type Listener = Box<dyn FnMut(FeedEvent)>;

/// Viewport and media lifecycle controller for one feed.
pub struct FeedController<S, C> {
    config: FeedConfig,
    registry: SlideRegistry,
    tracker: VisibilityTracker,
    generation: ScrollGeneration,
    preload: PreloadScheduler,
    audio: AudioSync<C>,
    surface: S,
    active: Option<usize>,
    primed: BTreeSet<usize>,
    wakes: Vec<PendingWake>,
    listener: Option<Listener>,
    tracer: Tracer,
}

impl<S, C> fmt::Debug for FeedController<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedController")
            .field("slides", &self.registry.len())
            .field("active", &self.active)
            .field("generation", &self.generation.current())
            .field("pending_wakes", &self.wakes.len())
            .finish_non_exhaustive()
    }
}

impl<S: MediaSurface, C: AudioCarrier> FeedController<S, C> {
    /// Creates a controller with an empty feed.
    ///
    /// `origin` (`scheme://host[:port]`) is used to compare media URLs.
    #[must_use]
    pub fn new(config: FeedConfig, surface: S, origin: &str) -> Self {
        Self {
            config,
            registry: SlideRegistry::new(),
            tracker: VisibilityTracker::new(config.snap_ratio),
            generation: ScrollGeneration::new(),
            preload: PreloadScheduler::new(config.preload_step),
            audio: AudioSync::new(config.sync, origin),
            surface,
            active: None,
            primed: BTreeSet::new(),
            wakes: Vec::new(),
            listener: None,
            tracer: Tracer::none(),
        }
    }

    /// Sets the receiver of [`FeedEvent`]s.
    pub fn set_listener(&mut self, listener: impl FnMut(FeedEvent) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Installs a trace sink. Dropped unless the `trace` feature is on.
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.tracer.set_sink(sink);
    }

    // -- queries ------------------------------------------------------------

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// The slide registry.
    #[must_use]
    pub fn registry(&self) -> &SlideRegistry {
        &self.registry
    }

    /// The media surface.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the media surface.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// The audio engine.
    #[must_use]
    pub fn audio(&self) -> &AudioSync<C> {
        &self.audio
    }

    /// Index of the active slide.
    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// The live scroll generation.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation.current()
    }

    /// The live observation context.
    #[must_use]
    pub fn observer_epoch(&self) -> ObserverEpoch {
        self.tracker.epoch()
    }

    /// Number of preload chains that have not finished.
    #[must_use]
    pub fn live_preload_chains(&self) -> usize {
        self.preload.live_chains()
    }

    /// Drains the wakes requested since the last call.
    pub fn take_wakes(&mut self) -> Vec<PendingWake> {
        core::mem::take(&mut self.wakes)
    }

    // -- slide set ----------------------------------------------------------

    /// Replaces the slide set and opens a fresh observation context.
    ///
    /// Every slide starts `Empty`; the application attaches the new slides
    /// and the next intersection batch picks the active one.
    pub fn rebuild<I, T>(&mut self, media_ids: I) -> ObserverEpoch
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.detach_all();
        self.registry.rebuild(media_ids);
        self.primed.clear();
        self.reattach()
    }

    /// Starts observing slide `index`. Unknown indices are ignored.
    pub fn attach(&mut self, index: usize) -> bool {
        index < self.registry.len() && self.tracker.attach(index)
    }

    /// Stops observing every slide and clears the active slide.
    ///
    /// The outgoing active slide is deactivated and the scroll generation
    /// moves, so background work from the old slide set stops.
    pub fn detach_all(&mut self) {
        if let Some(previous) = self.active.take() {
            self.deactivate(previous);
        }
        self.tracker.detach_all();
        let generation = self.generation.bump();
        self.tracer.generation(&GenerationEvent {
            generation,
            cause: GenerationCause::Rebuild,
        });
    }

    /// Opens a fresh observation context. Batches for older contexts are
    /// ignored.
    pub fn reattach(&mut self) -> ObserverEpoch {
        self.tracker.reattach()
    }

    // -- visibility ---------------------------------------------------------

    /// Applies an intersection batch from observation context `epoch`.
    pub fn observe(&mut self, epoch: ObserverEpoch, batch: &[Intersection]) {
        let registry = &self.registry;
        let observation = self.tracker.observe(
            epoch,
            batch,
            self.config.preload_distance,
            |index| registry.state(index).is_some_and(LoadState::is_populated),
        );

        for &index in &observation.needs_content {
            let priority = if observation.activate == Some(index) {
                LoadPriority::Active
            } else {
                LoadPriority::Background
            };
            self.load(index, priority, LoadTrigger::Visibility);
        }
        if let Some(index) = observation.activate {
            self.set_active(index);
        }
    }

    /// Makes `index` active without an intersection batch.
    ///
    /// Returns `false` if no such slide exists.
    pub fn activate_index(&mut self, index: usize) -> bool {
        if index >= self.registry.len() {
            return false;
        }
        self.set_active(index);
        true
    }

    // -- content callbacks --------------------------------------------------

    /// Reports that a slide's content finished loading.
    ///
    /// Activation side effects only run if the slide is still active.
    pub fn content_loaded(&mut self, index: usize) {
        let active = self.active == Some(index);
        if self.registry.transition(index, LoadState::Loaded).is_err() {
            self.tracer.load_settled(&LoadSettledEvent {
                index,
                outcome: LoadOutcome::Stale,
                active,
            });
            return;
        }
        self.tracer.load_settled(&LoadSettledEvent {
            index,
            outcome: LoadOutcome::Loaded,
            active,
        });

        if active {
            self.start_media(index);
        } else if self.kind_of(index) == Some(MediaKind::Gif) {
            self.surface.set_animating(index, false);
        }
    }

    /// Reports that a slide's content failed to load.
    pub fn content_failed(&mut self, index: usize) {
        let active = self.active == Some(index);
        if self.registry.transition(index, LoadState::Errored).is_err() {
            self.tracer.load_settled(&LoadSettledEvent {
                index,
                outcome: LoadOutcome::Stale,
                active,
            });
            return;
        }
        self.surface.show_error(index);
        if self.audio.active_video() == Some(index) {
            self.audio.detach();
        }
        self.tracer.load_settled(&LoadSettledEvent {
            index,
            outcome: LoadOutcome::Errored,
            active,
        });
    }

    /// Reports that a video played to its end.
    ///
    /// With auto-advance on, an active video requests the next slide.
    pub fn video_ended(&mut self, index: usize) {
        if self.config.auto_advance.is_some() && self.active == Some(index) {
            self.request_advance(index);
        }
    }

    // -- audio --------------------------------------------------------------

    /// Hands over the carriers created during the first user gesture.
    ///
    /// Returns `false` if audio was already unlocked.
    pub fn unlock_audio(&mut self, primary: C, standby: C) -> bool {
        let unlocked = self.audio.unlock(primary, standby);
        if unlocked && !self.audio.is_running() {
            self.attach_audio();
        }
        unlocked
    }

    /// Turns audio on and attaches it to the active video.
    pub fn enable_audio(&mut self) {
        self.audio.set_enabled(true);
        if !self.audio.is_running() {
            self.attach_audio();
        }
    }

    /// Turns audio off. Carriers are paused, not destroyed.
    pub fn disable_audio(&mut self) {
        self.audio.set_enabled(false);
    }

    /// Flips the audio preference and returns the new value.
    pub fn toggle_audio(&mut self) -> bool {
        if self.audio.is_enabled() {
            self.disable_audio();
        } else {
            self.enable_audio();
        }
        self.audio.is_enabled()
    }

    /// Returns the audio preference.
    #[must_use]
    pub fn audio_enabled(&self) -> bool {
        self.audio.is_enabled()
    }

    /// Buffers audio for `media_id` on the standby carrier.
    pub fn preload_audio(&mut self, media_id: &str) -> PreloadOutcome {
        let outcome = self.audio.preload(media_id);
        self.tracer.audio_preload(&AudioPreloadEvent {
            index: None,
            outcome,
        });
        outcome
    }

    /// Reports that a carrier has enough data to play.
    pub fn carrier_ready(&mut self, id: CarrierId) {
        let Some(index) = self.audio.active_video() else {
            return;
        };
        let clock = self.surface.video_clock(index);
        if let Some(start) = self.audio.carrier_ready(id, clock)
            && let Some(path) = self.audio.attach_path()
        {
            self.tracer
                .audio_attach(&AudioAttachEvent { index, path, start });
        }
    }

    /// Reports that a carrier element failed. The muted video keeps playing.
    pub fn carrier_failed(&mut self, id: CarrierId) {
        if let Some(role) = self.audio.carrier_failed(id) {
            self.tracer.audio_failure(&AudioFailureEvent { carrier: id, role });
        }
    }

    // -- timers -------------------------------------------------------------

    /// Runs a wake previously returned by [`take_wakes`](Self::take_wakes).
    pub fn wake(&mut self, wake: Wake) {
        match wake {
            Wake::PreloadStep(chain) => self.preload_step(chain),
            Wake::PrimeFrame { index } => {
                if self.active != Some(index) {
                    self.surface.pause(index);
                }
            }
            Wake::AudioSync(epoch) => self.sync_tick(epoch),
            Wake::SlowLoad { index, epoch } => {
                if epoch == self.registry.epoch()
                    && self.registry.state(index) == Some(LoadState::Loading)
                {
                    self.tracer.slow_load(&SlowLoadEvent {
                        index,
                        waited: self.config.slow_load_after,
                    });
                }
            }
            Wake::AutoAdvance(generation) => {
                if let Some(index) = self.active
                    && self.generation.is_current(generation)
                {
                    self.request_advance(index);
                }
            }
        }
    }

    // -- internals ----------------------------------------------------------

    fn kind_of(&self, index: usize) -> Option<MediaKind> {
        self.registry.get(index).map(|s| s.kind())
    }

    fn notify(&mut self, event: FeedEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(event);
        }
    }

    fn set_active(&mut self, index: usize) {
        if self.active == Some(index) {
            return;
        }
        let previous = self.active.take();
        if let Some(previous) = previous {
            self.deactivate(previous);
        }

        let generation = self.generation.bump();
        self.tracer.generation(&GenerationEvent {
            generation,
            cause: GenerationCause::IndexChange,
        });
        self.active = Some(index);

        if let Some(kind) = self.kind_of(index) {
            self.tracer.activate(&ActivateEvent {
                index,
                kind,
                generation,
            });
        }
        self.load(index, LoadPriority::Active, LoadTrigger::Activation);
        self.start_media(index);
        if let Some(delay) = self.config.auto_advance
            && self.kind_of(index).is_some_and(|k| !k.is_video())
        {
            self.wakes
                .push(PendingWake::new(Wake::AutoAdvance(generation), delay));
        }
        self.notify(FeedEvent::ActiveChanged { index });

        let direction = Direction::of_move(previous, index);
        let reach = self.config.reach.reach_for(self.registry.len());
        let ahead = self
            .preload
            .schedule(index, reach, direction, true, generation);
        let behind = self.preload.schedule(
            index,
            self.config.preload_behind,
            direction.reverse(),
            false,
            generation,
        );
        self.wakes.extend(ahead.into_iter().chain(behind));
    }

    /// Starts playback side effects for the active slide.
    fn start_media(&mut self, index: usize) {
        let Some(slide) = self.registry.get(index) else {
            return;
        };
        if slide.load_state() == LoadState::Errored {
            return;
        }
        match slide.kind() {
            MediaKind::Video => {
                if self.audio.active_video() != Some(index) {
                    self.audio.bind_video(index, slide.media_id());
                }
                self.surface.set_muted(index, true);
                self.surface.set_buffering(index, Buffering::Auto);
                if let Err(error) = self.surface.play(index) {
                    self.tracer
                        .playback_rejected(&PlaybackRejectedEvent { index, error });
                }
                if !self.audio.is_running() {
                    self.attach_audio();
                }
            }
            MediaKind::Gif => self.surface.set_animating(index, true),
            MediaKind::Image => {}
        }
    }

    fn deactivate(&mut self, index: usize) {
        let Some(slide) = self.registry.get(index) else {
            return;
        };
        let kind = slide.kind();
        let state = slide.load_state();

        match kind {
            MediaKind::Video => {
                self.surface.pause(index);
                if self.audio.active_video() == Some(index) {
                    self.audio.detach();
                }
            }
            MediaKind::Gif => self.surface.set_animating(index, false),
            MediaKind::Image => {}
        }

        let teardown = if state != LoadState::Errored
            && self.surface.transfer(index) == Transfer::InFlight
        {
            self.surface.abort(index);
            // An Empty slide has nothing to reset.
            let _ = self.registry.transition(index, LoadState::Empty);
            self.primed.remove(&index);
            Teardown::Aborted
        } else {
            // Idle or complete: keep the content, stop buffering ahead.
            if kind.is_video() && state != LoadState::Errored {
                self.surface.set_buffering(index, Buffering::None);
            }
            Teardown::Resident
        };
        self.tracer.deactivate(&DeactivateEvent {
            index,
            kind,
            teardown,
        });
    }

    /// Attaches content to an `Empty` slide. Returns `false` otherwise.
    fn load(&mut self, index: usize, priority: LoadPriority, trigger: LoadTrigger) -> bool {
        if self.registry.transition(index, LoadState::Loading).is_err() {
            return false;
        }
        let Some(slide) = self.registry.get(index) else {
            return false;
        };
        let kind = slide.kind();
        self.surface.load(slide, priority);
        self.tracer.load(&LoadEvent {
            index,
            kind,
            priority,
            trigger,
        });
        if kind.is_video() {
            self.wakes.push(PendingWake::new(
                Wake::SlowLoad {
                    index,
                    epoch: self.registry.epoch(),
                },
                self.config.slow_load_after,
            ));
        }
        true
    }

    fn preload_step(&mut self, chain: ChainId) {
        let Some(step) = self.preload.advance(chain, self.generation.current()) else {
            return;
        };
        if let Some(next) = step.next {
            self.wakes.push(next);
        }

        let outcome = if step.stale {
            StepOutcome::Stale
        } else {
            match step.target.filter(|&t| t < self.registry.len()) {
                None => StepOutcome::OutOfRange,
                Some(target) => {
                    let eager = step.lead && step.step == 1;
                    let priority = if eager {
                        LoadPriority::Next
                    } else {
                        LoadPriority::Background
                    };
                    let triggered = self.load(target, priority, LoadTrigger::Preload);
                    if eager {
                        self.prepare_next(target);
                    }
                    if triggered {
                        StepOutcome::Triggered
                    } else {
                        StepOutcome::Populated
                    }
                }
            }
        };

        self.tracer.preload_step(&PreloadStepEvent {
            chain,
            generation: step.generation,
            step: step.step,
            direction: step.direction,
            target: step.target,
            outcome,
        });
    }

    /// Primes the first frame of the upcoming video and buffers its audio.
    fn prepare_next(&mut self, index: usize) {
        let Some(slide) = self.registry.get(index) else {
            return;
        };
        if !slide.kind().is_video() || slide.load_state() == LoadState::Errored {
            return;
        }

        let outcome = self.audio.preload(slide.media_id());
        self.tracer.audio_preload(&AudioPreloadEvent {
            index: Some(index),
            outcome,
        });

        if self.active == Some(index) || !self.primed.insert(index) {
            return;
        }
        self.surface.set_buffering(index, Buffering::Auto);
        self.surface.set_muted(index, true);
        match self.surface.play(index) {
            Ok(()) => self.wakes.push(PendingWake::new(
                Wake::PrimeFrame { index },
                self.config.prime_hold,
            )),
            Err(error) => self
                .tracer
                .playback_rejected(&PlaybackRejectedEvent { index, error }),
        }
    }

    fn attach_audio(&mut self) {
        let Some(index) = self.audio.active_video() else {
            return;
        };
        let clock = self.surface.video_clock(index);
        if let Some(report) = self.audio.attach(clock) {
            self.tracer.audio_attach(&AudioAttachEvent {
                index: report.index,
                path: report.path,
                start: report.start,
            });
            self.wakes.push(report.wake);
        }
    }

    fn sync_tick(&mut self, epoch: SyncEpoch) {
        let Some(index) = self.audio.active_video() else {
            return;
        };
        let clock = self.surface.video_clock(index);
        let Some(tick) = self.audio.tick(epoch, clock) else {
            return;
        };
        if let (Some(drift), Some(correction)) = (tick.drift, tick.correction) {
            self.tracer.drift(&DriftEvent {
                index,
                drift,
                correction,
            });
        }
        self.wakes.push(tick.next);
    }

    fn request_advance(&mut self, from: usize) {
        let to = from + 1;
        if to < self.registry.len() {
            self.notify(FeedEvent::AdvanceRequested { from, to });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::Slide;
    use crate::surface::{PlaybackError, VideoClock};
    use alloc::rc::Rc;
    use core::cell::RefCell;

    #[derive(Debug, Default)]
    struct Surface {
        in_flight: BTreeSet<usize>,
        loads: Vec<(usize, LoadPriority)>,
        aborted: Vec<usize>,
        played: Vec<usize>,
        errors: Vec<usize>,
    }

    impl MediaSurface for Surface {
        fn load(&mut self, slide: &Slide, priority: LoadPriority) {
            self.loads.push((slide.index(), priority));
            self.in_flight.insert(slide.index());
        }
        fn transfer(&self, index: usize) -> Transfer {
            if self.in_flight.contains(&index) {
                Transfer::InFlight
            } else {
                Transfer::Complete
            }
        }
        fn play(&mut self, index: usize) -> Result<(), PlaybackError> {
            self.played.push(index);
            Ok(())
        }
        fn pause(&mut self, _index: usize) {}
        fn set_muted(&mut self, _index: usize, _muted: bool) {}
        fn set_buffering(&mut self, _index: usize, _buffering: Buffering) {}
        fn set_animating(&mut self, _index: usize, _animating: bool) {}
        fn video_clock(&self, _index: usize) -> Option<VideoClock> {
            Some(VideoClock {
                position: 0.0,
                paused: false,
            })
        }
        fn abort(&mut self, index: usize) {
            self.in_flight.remove(&index);
            self.aborted.push(index);
        }
        fn show_error(&mut self, index: usize) {
            self.errors.push(index);
        }
    }

    #[derive(Debug)]
    struct Silent;

    impl AudioCarrier for Silent {
        fn load(&mut self, _url: &str) {}
        fn play(&mut self) -> Result<(), PlaybackError> {
            Ok(())
        }
        fn pause(&mut self) {}
        fn is_paused(&self) -> bool {
            true
        }
        fn position(&self) -> f64 {
            0.0
        }
        fn seek(&mut self, _position: f64) {}
        fn rate(&self) -> f64 {
            1.0
        }
        fn set_rate(&mut self, _rate: f64) {}
        fn set_muted(&mut self, _muted: bool) {}
        fn is_muted(&self) -> bool {
            true
        }
        fn has_playable_data(&self) -> bool {
            true
        }
    }

    type Events = Rc<RefCell<Vec<FeedEvent>>>;

    fn controller(config: FeedConfig, ids: &[&str]) -> (FeedController<Surface, Silent>, Events) {
        let mut c = FeedController::new(config, Surface::default(), "http://feed.local");
        c.rebuild(ids.iter().copied());
        let events: Events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        c.set_listener(move |e| sink.borrow_mut().push(e));
        (c, events)
    }

    fn finish_transfer(c: &mut FeedController<Surface, Silent>, index: usize) {
        c.surface_mut().in_flight.remove(&index);
        c.content_loaded(index);
    }

    #[test]
    fn one_notification_and_one_bump_per_real_change() {
        let (mut c, events) = controller(FeedConfig::standard(), &["a.jpg", "b.jpg", "c.jpg"]);
        let start = c.generation();

        assert!(c.activate_index(0));
        assert!(c.activate_index(0));
        assert_eq!(c.generation(), Generation(start.0 + 1));
        assert!(c.activate_index(2));
        assert_eq!(c.generation(), Generation(start.0 + 2));
        assert!(!c.activate_index(3), "out of range");

        assert_eq!(
            *events.borrow(),
            [
                FeedEvent::ActiveChanged { index: 0 },
                FeedEvent::ActiveChanged { index: 2 },
            ]
        );
    }

    #[test]
    fn in_flight_slide_is_aborted_on_deactivate() {
        let (mut c, _) = controller(FeedConfig::standard(), &["a.mp4", "b.mp4"]);
        c.activate_index(0);
        c.activate_index(1);
        assert_eq!(c.surface().aborted, [0]);
        assert_eq!(c.registry().state(0), Some(LoadState::Empty));

        // The aborted transfer reports back late.
        c.content_loaded(0);
        assert_eq!(c.registry().state(0), Some(LoadState::Empty));
        assert_eq!(
            c.surface().played.iter().filter(|&&i| i == 0).count(),
            1,
            "only the activation played slide 0"
        );
    }

    #[test]
    fn loaded_slide_stays_resident() {
        let (mut c, _) = controller(FeedConfig::standard(), &["a.mp4", "b.mp4"]);
        c.activate_index(0);
        finish_transfer(&mut c, 0);
        c.activate_index(1);
        assert!(c.surface().aborted.is_empty());
        assert_eq!(c.registry().state(0), Some(LoadState::Loaded));
    }

    #[test]
    fn late_load_of_inactive_slide_does_not_play() {
        let (mut c, _) = controller(FeedConfig::standard(), &["a.mp4", "b.mp4", "c.mp4"]);
        c.activate_index(0);
        loop {
            let steps: Vec<_> = c
                .take_wakes()
                .into_iter()
                .filter(|w| matches!(w.wake, Wake::PreloadStep(_)))
                .collect();
            if steps.is_empty() {
                break;
            }
            for step in steps {
                c.wake(step.wake);
            }
        }
        assert_eq!(c.registry().state(2), Some(LoadState::Loading));
        let played_before = c.surface().played.len();
        c.surface_mut().in_flight.remove(&2);
        c.content_loaded(2);
        assert_eq!(c.registry().state(2), Some(LoadState::Loaded));
        assert_eq!(c.surface().played.len(), played_before);
    }

    #[test]
    fn failed_slide_shows_error_and_is_not_aborted() {
        let (mut c, _) = controller(FeedConfig::standard(), &["a.jpg", "b.jpg"]);
        c.activate_index(0);
        c.content_failed(0);
        assert_eq!(c.surface().errors, [0]);
        c.activate_index(1);
        assert!(c.surface().aborted.is_empty());
        assert_eq!(c.registry().state(0), Some(LoadState::Errored));
    }

    #[test]
    fn auto_advance_is_generation_guarded() {
        let config = FeedConfig::standard().with_auto_advance();
        let (mut c, events) = controller(config, &["a.jpg", "b.jpg", "c.jpg"]);
        c.activate_index(0);
        let advance = c
            .take_wakes()
            .into_iter()
            .find(|w| matches!(w.wake, Wake::AutoAdvance(_)))
            .expect("image activation schedules an advance");
        assert_eq!(advance.after, core::time::Duration::from_secs(3));

        c.wake(advance.wake);
        assert_eq!(
            events.borrow().last(),
            Some(&FeedEvent::AdvanceRequested { from: 0, to: 1 })
        );

        c.activate_index(1);
        let count = events.borrow().len();
        c.wake(advance.wake);
        assert_eq!(events.borrow().len(), count, "stale advance is ignored");
    }

    #[test]
    fn ended_video_advances_only_when_enabled() {
        let (mut c, events) = controller(FeedConfig::standard(), &["a.mp4", "b.mp4"]);
        c.activate_index(0);
        c.video_ended(0);
        assert_eq!(events.borrow().len(), 1);

        let config = FeedConfig::standard().with_auto_advance();
        let (mut c, events) = controller(config, &["a.mp4", "b.mp4"]);
        c.activate_index(0);
        assert!(
            !c.take_wakes()
                .iter()
                .any(|w| matches!(w.wake, Wake::AutoAdvance(_))),
            "videos advance on end, not on a timer"
        );
        c.video_ended(0);
        assert_eq!(
            events.borrow().last(),
            Some(&FeedEvent::AdvanceRequested { from: 0, to: 1 })
        );
        c.activate_index(1);
        c.video_ended(1);
        assert_eq!(events.borrow().len(), 3, "last slide has nowhere to go");
    }

    #[test]
    fn rebuild_clears_active_and_moves_generation() {
        let (mut c, _) = controller(FeedConfig::standard(), &["a.jpg", "b.jpg"]);
        c.activate_index(1);
        let before = c.generation();
        let epoch = c.observer_epoch();
        let fresh = c.rebuild(["x.jpg"]);
        assert_ne!(fresh, epoch);
        assert_eq!(c.active_index(), None);
        assert!(c.generation() > before);
        assert_eq!(c.registry().len(), 1);
    }
}
