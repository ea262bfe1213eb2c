// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timestamped in-memory event recording.
//!
//! The controller owns its sink, so recording goes through a shared buffer:
//! a [`Recorder`] hands out [`RecorderSink`]s that append to it, and the
//! caller reads the events back from the recorder. Time is whatever the
//! driver says it is ([`Recorder::set_now`]); the core itself has no clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use localfeed_core::trace::{
    ActivateEvent, AudioAttachEvent, AudioFailureEvent, AudioPreloadEvent, DeactivateEvent,
    DriftEvent, GenerationEvent, LoadEvent, LoadSettledEvent, PlaybackRejectedEvent,
    PreloadStepEvent, SlowLoadEvent, TraceSink,
};

/// One recorded trace event.
#[derive(Clone, Copy, Debug)]
pub enum TraceEvent {
    /// See [`TraceSink::on_activate`].
    Activate(ActivateEvent),
    /// See [`TraceSink::on_deactivate`].
    Deactivate(DeactivateEvent),
    /// See [`TraceSink::on_load`].
    Load(LoadEvent),
    /// See [`TraceSink::on_load_settled`].
    LoadSettled(LoadSettledEvent),
    /// See [`TraceSink::on_playback_rejected`].
    PlaybackRejected(PlaybackRejectedEvent),
    /// See [`TraceSink::on_preload_step`].
    PreloadStep(PreloadStepEvent),
    /// See [`TraceSink::on_audio_attach`].
    AudioAttach(AudioAttachEvent),
    /// See [`TraceSink::on_audio_preload`].
    AudioPreload(AudioPreloadEvent),
    /// See [`TraceSink::on_drift`].
    Drift(DriftEvent),
    /// See [`TraceSink::on_audio_failure`].
    AudioFailure(AudioFailureEvent),
    /// See [`TraceSink::on_slow_load`].
    SlowLoad(SlowLoadEvent),
    /// See [`TraceSink::on_generation`].
    Generation(GenerationEvent),
}

impl TraceEvent {
    /// Short event name for logs and exports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Activate(_) => "Activate",
            Self::Deactivate(_) => "Deactivate",
            Self::Load(_) => "Load",
            Self::LoadSettled(_) => "LoadSettled",
            Self::PlaybackRejected(_) => "PlaybackRejected",
            Self::PreloadStep(_) => "PreloadStep",
            Self::AudioAttach(_) => "AudioAttach",
            Self::AudioPreload(_) => "AudioPreload",
            Self::Drift(_) => "Drift",
            Self::AudioFailure(_) => "AudioFailure",
            Self::SlowLoad(_) => "SlowLoad",
            Self::Generation(_) => "Generation",
        }
    }

    /// Delivers the event to `sink` as if the controller had just emitted it.
    pub fn replay(&self, sink: &mut dyn TraceSink) {
        match self {
            Self::Activate(e) => sink.on_activate(e),
            Self::Deactivate(e) => sink.on_deactivate(e),
            Self::Load(e) => sink.on_load(e),
            Self::LoadSettled(e) => sink.on_load_settled(e),
            Self::PlaybackRejected(e) => sink.on_playback_rejected(e),
            Self::PreloadStep(e) => sink.on_preload_step(e),
            Self::AudioAttach(e) => sink.on_audio_attach(e),
            Self::AudioPreload(e) => sink.on_audio_preload(e),
            Self::Drift(e) => sink.on_drift(e),
            Self::AudioFailure(e) => sink.on_audio_failure(e),
            Self::SlowLoad(e) => sink.on_slow_load(e),
            Self::Generation(e) => sink.on_generation(e),
        }
    }
}

/// A trace event and the driver time at which it was emitted.
#[derive(Clone, Copy, Debug)]
pub struct Recorded {
    /// Driver time.
    pub at: Duration,
    /// The event.
    pub event: TraceEvent,
}

#[derive(Debug, Default)]
struct Buffer {
    now: Duration,
    events: Vec<Recorded>,
}

/// Owner of a shared recording buffer.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    buffer: Rc<RefCell<Buffer>>,
}

impl Recorder {
    /// Creates an empty recorder at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a sink that appends to this recorder.
    #[must_use]
    pub fn sink(&self) -> RecorderSink {
        RecorderSink {
            buffer: Rc::clone(&self.buffer),
        }
    }

    /// Sets the timestamp applied to subsequent events.
    pub fn set_now(&self, now: Duration) {
        self.buffer.borrow_mut().now = now;
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<Recorded> {
        self.buffer.borrow().events.clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.borrow().events.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards all recorded events.
    pub fn clear(&self) {
        self.buffer.borrow_mut().events.clear();
    }
}

/// A [`TraceSink`] appending to a [`Recorder`].
#[derive(Debug)]
pub struct RecorderSink {
    buffer: Rc<RefCell<Buffer>>,
}

impl RecorderSink {
    fn push(&mut self, event: TraceEvent) {
        let mut buffer = self.buffer.borrow_mut();
        let at = buffer.now;
        buffer.events.push(Recorded { at, event });
    }
}

impl TraceSink for RecorderSink {
    fn on_activate(&mut self, e: &ActivateEvent) {
        self.push(TraceEvent::Activate(*e));
    }

    fn on_deactivate(&mut self, e: &DeactivateEvent) {
        self.push(TraceEvent::Deactivate(*e));
    }

    fn on_load(&mut self, e: &LoadEvent) {
        self.push(TraceEvent::Load(*e));
    }

    fn on_load_settled(&mut self, e: &LoadSettledEvent) {
        self.push(TraceEvent::LoadSettled(*e));
    }

    fn on_playback_rejected(&mut self, e: &PlaybackRejectedEvent) {
        self.push(TraceEvent::PlaybackRejected(*e));
    }

    fn on_preload_step(&mut self, e: &PreloadStepEvent) {
        self.push(TraceEvent::PreloadStep(*e));
    }

    fn on_audio_attach(&mut self, e: &AudioAttachEvent) {
        self.push(TraceEvent::AudioAttach(*e));
    }

    fn on_audio_preload(&mut self, e: &AudioPreloadEvent) {
        self.push(TraceEvent::AudioPreload(*e));
    }

    fn on_drift(&mut self, e: &DriftEvent) {
        self.push(TraceEvent::Drift(*e));
    }

    fn on_audio_failure(&mut self, e: &AudioFailureEvent) {
        self.push(TraceEvent::AudioFailure(*e));
    }

    fn on_slow_load(&mut self, e: &SlowLoadEvent) {
        self.push(TraceEvent::SlowLoad(*e));
    }

    fn on_generation(&mut self, e: &GenerationEvent) {
        self.push(TraceEvent::Generation(*e));
    }
}
