// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use localfeed_core::audio::{AttachPath, Correction, StartState};
use localfeed_core::trace::{
    ActivateEvent, AudioAttachEvent, AudioFailureEvent, AudioPreloadEvent, DeactivateEvent,
    DriftEvent, GenerationEvent, LoadEvent, LoadSettledEvent, PlaybackRejectedEvent,
    PreloadStepEvent, SlowLoadEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// The destination, for interleaving extra output between events.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

fn slot(target: Option<usize>) -> String {
    target.map_or_else(|| String::from("-"), |t| t.to_string())
}

fn path_name(path: AttachPath) -> &'static str {
    match path {
        AttachPath::Swapped => "swap",
        AttachPath::Reused => "reuse",
        AttachPath::Fresh => "fresh",
    }
}

fn start_name(start: StartState) -> String {
    match start {
        StartState::Playing => String::from("playing"),
        StartState::Deferred => String::from("deferred"),
        StartState::Held => String::from("held"),
        StartState::Rejected(e) => format!("rejected ({e})"),
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_activate(&mut self, e: &ActivateEvent) {
        let _ = writeln!(
            self.writer,
            "[activate] slide={} kind={} gen={}",
            e.index,
            e.kind.as_str(),
            e.generation.0,
        );
    }

    fn on_deactivate(&mut self, e: &DeactivateEvent) {
        let _ = writeln!(
            self.writer,
            "[deactivate] slide={} kind={} teardown={:?}",
            e.index,
            e.kind.as_str(),
            e.teardown,
        );
    }

    fn on_load(&mut self, e: &LoadEvent) {
        let _ = writeln!(
            self.writer,
            "[load] slide={} kind={} priority={:?} via={:?}",
            e.index,
            e.kind.as_str(),
            e.priority,
            e.trigger,
        );
    }

    fn on_load_settled(&mut self, e: &LoadSettledEvent) {
        let _ = writeln!(
            self.writer,
            "[settled] slide={} outcome={:?}{}",
            e.index,
            e.outcome,
            if e.active { " (active)" } else { "" },
        );
    }

    fn on_playback_rejected(&mut self, e: &PlaybackRejectedEvent) {
        let _ = writeln!(self.writer, "[rejected] slide={} {}", e.index, e.error);
    }

    fn on_preload_step(&mut self, e: &PreloadStepEvent) {
        let _ = writeln!(
            self.writer,
            "[preload] chain={} gen={} step={} {:?} target={} {:?}",
            e.chain.0,
            e.generation.0,
            e.step,
            e.direction,
            slot(e.target),
            e.outcome,
        );
    }

    fn on_audio_attach(&mut self, e: &AudioAttachEvent) {
        let _ = writeln!(
            self.writer,
            "[audio:attach] slide={} path={} {}",
            e.index,
            path_name(e.path),
            start_name(e.start),
        );
    }

    fn on_audio_preload(&mut self, e: &AudioPreloadEvent) {
        let _ = writeln!(
            self.writer,
            "[audio:preload] slide={} {:?}",
            slot(e.index),
            e.outcome,
        );
    }

    fn on_drift(&mut self, e: &DriftEvent) {
        let correction = match e.correction {
            Correction::InSync => String::from("in-sync"),
            Correction::Nudge { rate } => format!("nudge {rate:.2}x"),
            Correction::HardSeek => String::from("hard-seek"),
        };
        let _ = writeln!(
            self.writer,
            "[audio:drift] slide={} drift={:+.3}s {}",
            e.index, e.drift, correction,
        );
    }

    fn on_audio_failure(&mut self, e: &AudioFailureEvent) {
        let _ = writeln!(
            self.writer,
            "[audio:error] carrier={} role={:?}",
            e.carrier.0, e.role,
        );
    }

    fn on_slow_load(&mut self, e: &SlowLoadEvent) {
        let _ = writeln!(
            self.writer,
            "[slow] slide={} still loading after {:.1}s",
            e.index,
            e.waited.as_secs_f64(),
        );
    }

    fn on_generation(&mut self, e: &GenerationEvent) {
        let _ = writeln!(
            self.writer,
            "[generation] {} ({:?})",
            e.generation.0, e.cause,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use localfeed_core::generation::Generation;
    use localfeed_core::media::MediaKind;
    use localfeed_core::preload::{ChainId, Direction, StepOutcome};

    fn output(f: impl FnOnce(&mut PrettyPrintSink<Vec<u8>>)) -> String {
        let mut sink = PrettyPrintSink::with_writer(Vec::new());
        f(&mut sink);
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn activate_line() {
        let text = output(|s| {
            s.on_activate(&ActivateEvent {
                index: 4,
                kind: MediaKind::Video,
                generation: Generation(9),
            });
        });
        assert_eq!(text, "[activate] slide=4 kind=video gen=9\n");
    }

    #[test]
    fn drift_and_preload_lines() {
        let text = output(|s| {
            s.on_drift(&DriftEvent {
                index: 1,
                drift: 0.3,
                correction: Correction::Nudge { rate: 0.95 },
            });
            s.on_preload_step(&PreloadStepEvent {
                chain: ChainId(2),
                generation: Generation(3),
                step: 1,
                direction: Direction::Behind,
                target: None,
                outcome: StepOutcome::OutOfRange,
            });
        });
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "[audio:drift] slide=1 drift=+0.300s nudge 0.95x");
        assert_eq!(
            lines[1],
            "[preload] chain=2 gen=3 step=1 Behind target=- OutOfRange"
        );
    }
}
