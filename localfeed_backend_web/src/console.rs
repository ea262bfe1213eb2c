// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Browser console trace output.

use alloc::format;
use alloc::string::String;

use localfeed_core::trace::{
    ActivateEvent, AudioAttachEvent, AudioFailureEvent, AudioPreloadEvent, DeactivateEvent,
    DriftEvent, GenerationEvent, LoadEvent, LoadSettledEvent, PlaybackRejectedEvent,
    PreloadStepEvent, SlowLoadEvent, TraceSink,
};

use crate::timer::performance_now;

/// Writes one `console.debug` line per event, prefixed with
/// `performance.now()` in milliseconds.
///
/// Slow loads and carrier failures go to `console.warn`. Drift ticks are only
/// logged when a correction was applied.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    _private: (),
}

impl ConsoleSink {
    /// Creates a console sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn debug(line: String) {
    web_sys::console::debug_1(&format!("{:9.1} {line}", performance_now()).into());
}

fn warn(line: String) {
    web_sys::console::warn_1(&format!("{:9.1} {line}", performance_now()).into());
}

impl TraceSink for ConsoleSink {
    fn on_activate(&mut self, e: &ActivateEvent) {
        debug(format!(
            "activate #{} ({}) gen {}",
            e.index,
            e.kind.as_str(),
            e.generation.0
        ));
    }

    fn on_deactivate(&mut self, e: &DeactivateEvent) {
        debug(format!("deactivate #{} {:?}", e.index, e.teardown));
    }

    fn on_load(&mut self, e: &LoadEvent) {
        debug(format!(
            "load #{} {:?} via {:?}",
            e.index, e.priority, e.trigger
        ));
    }

    fn on_load_settled(&mut self, e: &LoadSettledEvent) {
        debug(format!("settled #{} {:?}", e.index, e.outcome));
    }

    fn on_playback_rejected(&mut self, e: &PlaybackRejectedEvent) {
        debug(format!("play #{} rejected: {}", e.index, e.error));
    }

    fn on_preload_step(&mut self, e: &PreloadStepEvent) {
        debug(format!(
            "preload chain {} step {} -> {:?} {:?}",
            e.chain.0, e.step, e.target, e.outcome
        ));
    }

    fn on_audio_attach(&mut self, e: &AudioAttachEvent) {
        debug(format!(
            "audio attach #{} {:?} {:?}",
            e.index, e.path, e.start
        ));
    }

    fn on_audio_preload(&mut self, e: &AudioPreloadEvent) {
        debug(format!("audio preload {:?} {:?}", e.index, e.outcome));
    }

    fn on_drift(&mut self, e: &DriftEvent) {
        if e.correction != localfeed_core::audio::Correction::InSync {
            debug(format!(
                "audio drift #{} {:+.3}s {:?}",
                e.index, e.drift, e.correction
            ));
        }
    }

    fn on_audio_failure(&mut self, e: &AudioFailureEvent) {
        warn(format!("audio carrier {} failed as {:?}", e.carrier.0, e.role));
    }

    fn on_slow_load(&mut self, e: &SlowLoadEvent) {
        warn(format!(
            "slide #{} still loading after {:.1}s",
            e.index,
            e.waited.as_secs_f64()
        ));
    }

    fn on_generation(&mut self, e: &GenerationEvent) {
        debug(format!("generation {} ({:?})", e.generation.0, e.cause));
    }
}
