// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the feed controller.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! controller calls at each lifecycle step. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed sink. When the `trace` feature is
//! **off**, every `Tracer` method compiles to nothing and installed sinks are
//! dropped. When **on**, each method performs a single `Option` branch before
//! dispatching.
//!
//! Playback rejections, stale callbacks and carrier failures are never
//! surfaced as errors; this is where they go.

use alloc::boxed::Box;
use core::time::Duration;

use crate::audio::{AttachPath, CarrierId, CarrierRole, Correction, PreloadOutcome, StartState};
use crate::generation::Generation;
use crate::media::MediaKind;
use crate::preload::{ChainId, Direction, StepOutcome};
use crate::surface::{LoadPriority, PlaybackError};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What asked for a load.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadTrigger {
    /// A slide entered the viewport or the observer margin.
    Visibility,
    /// The slide became active without content.
    Activation,
    /// A preload chain step.
    Preload,
}

/// How a load settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadOutcome {
    /// Content is resident.
    Loaded,
    /// Content failed; the error indicator is shown.
    Errored,
    /// The callback arrived for a slide that was aborted or rebuilt.
    Stale,
}

/// What deactivation did with a slide's content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Teardown {
    /// Content kept in memory.
    Resident,
    /// The in-flight transfer was cancelled and the slide emptied.
    Aborted,
}

/// Why the scroll generation moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenerationCause {
    /// The active slide changed.
    IndexChange,
    /// The slide set was torn down.
    Rebuild,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a slide becomes active.
#[derive(Clone, Copy, Debug)]
pub struct ActivateEvent {
    /// Slide index.
    pub index: usize,
    /// Media kind.
    pub kind: MediaKind,
    /// Generation after the change.
    pub generation: Generation,
}

/// Emitted when a slide stops being active.
#[derive(Clone, Copy, Debug)]
pub struct DeactivateEvent {
    /// Slide index.
    pub index: usize,
    /// Media kind.
    pub kind: MediaKind,
    /// What happened to its content.
    pub teardown: Teardown,
}

/// Emitted when content is attached to a slide.
#[derive(Clone, Copy, Debug)]
pub struct LoadEvent {
    /// Slide index.
    pub index: usize,
    /// Media kind.
    pub kind: MediaKind,
    /// Requested priority.
    pub priority: LoadPriority,
    /// What asked for it.
    pub trigger: LoadTrigger,
}

/// Emitted when a load completes, fails, or reports back too late.
#[derive(Clone, Copy, Debug)]
pub struct LoadSettledEvent {
    /// Slide index.
    pub index: usize,
    /// How it settled.
    pub outcome: LoadOutcome,
    /// Whether the slide was active at the time.
    pub active: bool,
}

/// Emitted when a video refuses to play.
#[derive(Clone, Copy, Debug)]
pub struct PlaybackRejectedEvent {
    /// Slide index.
    pub index: usize,
    /// The refusal.
    pub error: PlaybackError,
}

/// Emitted at every preload chain step.
#[derive(Clone, Copy, Debug)]
pub struct PreloadStepEvent {
    /// Chain identity.
    pub chain: ChainId,
    /// Generation captured by the chain.
    pub generation: Generation,
    /// Step number, starting at 1.
    pub step: usize,
    /// Walking direction.
    pub direction: Direction,
    /// Visited index.
    pub target: Option<usize>,
    /// What the step did.
    pub outcome: StepOutcome,
}

/// Emitted when audio attaches to the active video.
#[derive(Clone, Copy, Debug)]
pub struct AudioAttachEvent {
    /// Slide index of the video.
    pub index: usize,
    /// How the audio was obtained.
    pub path: AttachPath,
    /// Whether the carrier started.
    pub start: StartState,
}

/// Emitted for every standby preload request.
#[derive(Clone, Copy, Debug)]
pub struct AudioPreloadEvent {
    /// Slide the request was made for, when known.
    pub index: Option<usize>,
    /// What the engine did.
    pub outcome: PreloadOutcome,
}

/// Emitted for every evaluated drift correction.
#[derive(Clone, Copy, Debug)]
pub struct DriftEvent {
    /// Slide index of the video.
    pub index: usize,
    /// Carrier position minus video position, in seconds.
    pub drift: f64,
    /// The applied correction.
    pub correction: Correction,
}

/// Emitted when a carrier element reports an error.
#[derive(Clone, Copy, Debug)]
pub struct AudioFailureEvent {
    /// Carrier identity.
    pub carrier: CarrierId,
    /// Its role at the time.
    pub role: CarrierRole,
}

/// Emitted when a video is still loading after the soft timeout.
#[derive(Clone, Copy, Debug)]
pub struct SlowLoadEvent {
    /// Slide index.
    pub index: usize,
    /// How long it has been loading.
    pub waited: Duration,
}

/// Emitted when the scroll generation moves.
#[derive(Clone, Copy, Debug)]
pub struct GenerationEvent {
    /// The new generation.
    pub generation: Generation,
    /// Why it moved.
    pub cause: GenerationCause,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the controller.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a slide becomes active.
    fn on_activate(&mut self, e: &ActivateEvent) {
        _ = e;
    }

    /// Called when a slide stops being active.
    fn on_deactivate(&mut self, e: &DeactivateEvent) {
        _ = e;
    }

    /// Called when content is attached to a slide.
    fn on_load(&mut self, e: &LoadEvent) {
        _ = e;
    }

    /// Called when a load settles.
    fn on_load_settled(&mut self, e: &LoadSettledEvent) {
        _ = e;
    }

    /// Called when a video refuses to play.
    fn on_playback_rejected(&mut self, e: &PlaybackRejectedEvent) {
        _ = e;
    }

    /// Called at every preload chain step.
    fn on_preload_step(&mut self, e: &PreloadStepEvent) {
        _ = e;
    }

    /// Called when audio attaches to the active video.
    fn on_audio_attach(&mut self, e: &AudioAttachEvent) {
        _ = e;
    }

    /// Called for every standby preload request.
    fn on_audio_preload(&mut self, e: &AudioPreloadEvent) {
        _ = e;
    }

    /// Called for every evaluated drift correction.
    fn on_drift(&mut self, e: &DriftEvent) {
        _ = e;
    }

    /// Called when a carrier element fails.
    fn on_audio_failure(&mut self, e: &AudioFailureEvent) {
        _ = e;
    }

    /// Called when a video load exceeds the soft timeout.
    fn on_slow_load(&mut self, e: &SlowLoadEvent) {
        _ = e;
    }

    /// Called when the scroll generation moves.
    fn on_generation(&mut self, e: &GenerationEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Owning wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

macro_rules! emit {
    ($tracer:ident . $method:ident ( $e:ident )) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $tracer.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        let mut tracer = Self::none();
        tracer.set_sink(sink);
        tracer
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self {
            #[cfg(feature = "trace")]
            sink: None,
        }
    }

    /// Replaces the sink.
    pub fn set_sink(&mut self, sink: Box<dyn TraceSink>) {
        #[cfg(feature = "trace")]
        {
            self.sink = Some(sink);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
        }
    }

    /// Emits an [`ActivateEvent`].
    #[inline]
    pub fn activate(&mut self, e: &ActivateEvent) {
        emit!(self.on_activate(e));
    }

    /// Emits a [`DeactivateEvent`].
    #[inline]
    pub fn deactivate(&mut self, e: &DeactivateEvent) {
        emit!(self.on_deactivate(e));
    }

    /// Emits a [`LoadEvent`].
    #[inline]
    pub fn load(&mut self, e: &LoadEvent) {
        emit!(self.on_load(e));
    }

    /// Emits a [`LoadSettledEvent`].
    #[inline]
    pub fn load_settled(&mut self, e: &LoadSettledEvent) {
        emit!(self.on_load_settled(e));
    }

    /// Emits a [`PlaybackRejectedEvent`].
    #[inline]
    pub fn playback_rejected(&mut self, e: &PlaybackRejectedEvent) {
        emit!(self.on_playback_rejected(e));
    }

    /// Emits a [`PreloadStepEvent`].
    #[inline]
    pub fn preload_step(&mut self, e: &PreloadStepEvent) {
        emit!(self.on_preload_step(e));
    }

    /// Emits an [`AudioAttachEvent`].
    #[inline]
    pub fn audio_attach(&mut self, e: &AudioAttachEvent) {
        emit!(self.on_audio_attach(e));
    }

    /// Emits an [`AudioPreloadEvent`].
    #[inline]
    pub fn audio_preload(&mut self, e: &AudioPreloadEvent) {
        emit!(self.on_audio_preload(e));
    }

    /// Emits a [`DriftEvent`].
    #[inline]
    pub fn drift(&mut self, e: &DriftEvent) {
        emit!(self.on_drift(e));
    }

    /// Emits an [`AudioFailureEvent`].
    #[inline]
    pub fn audio_failure(&mut self, e: &AudioFailureEvent) {
        emit!(self.on_audio_failure(e));
    }

    /// Emits a [`SlowLoadEvent`].
    #[inline]
    pub fn slow_load(&mut self, e: &SlowLoadEvent) {
        emit!(self.on_slow_load(e));
    }

    /// Emits a [`GenerationEvent`].
    #[inline]
    pub fn generation(&mut self, e: &GenerationEvent) {
        emit!(self.on_generation(e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_activate() -> ActivateEvent {
        ActivateEvent {
            index: 3,
            kind: MediaKind::Video,
            generation: Generation(7),
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_activate(&sample_activate());
        sink.on_slow_load(&SlowLoadEvent {
            index: 0,
            waited: Duration::from_secs(8),
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.activate(&sample_activate());
        tracer.generation(&GenerationEvent {
            generation: Generation(1),
            cause: GenerationCause::Rebuild,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::rc::Rc;
        use alloc::vec::Vec;
        use core::cell::RefCell;

        struct RecordingSink {
            activated: Rc<RefCell<Vec<usize>>>,
        }
        impl TraceSink for RecordingSink {
            fn on_activate(&mut self, e: &ActivateEvent) {
                self.activated.borrow_mut().push(e.index);
            }
        }

        let activated = Rc::new(RefCell::new(Vec::new()));
        let mut tracer = Tracer::new(Box::new(RecordingSink {
            activated: Rc::clone(&activated),
        }));
        tracer.activate(&sample_activate());
        tracer.deactivate(&DeactivateEvent {
            index: 3,
            kind: MediaKind::Video,
            teardown: Teardown::Resident,
        });
        assert_eq!(*activated.borrow(), [3]);
    }
}
