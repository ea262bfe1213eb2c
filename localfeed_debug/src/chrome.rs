// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads events from a [`Recorder`](super::recorder::Recorder)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Lane layout: thread 0 shows which slide is active (`B`/`E` pairs), thread
//! `index + 1` shows each slide's transfer from load to settle or abort, and
//! thread 1000 carries audio events.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};
use std::time::Duration;

use serde_json::{Value, json};

use localfeed_core::trace::Teardown;

use crate::recorder::{Recorded, TraceEvent};

const ACTIVE_LANE: usize = 0;
const AUDIO_LANE: usize = 1000;

fn slide_lane(index: usize) -> usize {
    index + 1
}

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(recorded: &[Recorded], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for r in recorded {
        let ts = micros(r.at);
        match r.event {
            TraceEvent::Activate(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": format!("slide {}", e.index),
                    "cat": "Active",
                    "ts": ts,
                    "pid": 0,
                    "tid": ACTIVE_LANE,
                    "args": {
                        "kind": e.kind.as_str(),
                        "generation": e.generation.0,
                    }
                }));
            }
            TraceEvent::Deactivate(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("slide {}", e.index),
                    "cat": "Active",
                    "ts": ts,
                    "pid": 0,
                    "tid": ACTIVE_LANE,
                    "args": {
                        "teardown": format!("{:?}", e.teardown),
                    }
                }));
                if e.teardown == Teardown::Aborted {
                    events.push(json!({
                        "ph": "E",
                        "name": "load",
                        "cat": "Transfer",
                        "ts": ts,
                        "pid": 0,
                        "tid": slide_lane(e.index),
                        "args": { "outcome": "Aborted" }
                    }));
                }
            }
            TraceEvent::Load(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": "load",
                    "cat": "Transfer",
                    "ts": ts,
                    "pid": 0,
                    "tid": slide_lane(e.index),
                    "args": {
                        "kind": e.kind.as_str(),
                        "priority": format!("{:?}", e.priority),
                        "trigger": format!("{:?}", e.trigger),
                    }
                }));
            }
            TraceEvent::LoadSettled(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": "load",
                    "cat": "Transfer",
                    "ts": ts,
                    "pid": 0,
                    "tid": slide_lane(e.index),
                    "args": {
                        "outcome": format!("{:?}", e.outcome),
                        "active": e.active,
                    }
                }));
            }
            TraceEvent::PlaybackRejected(e) => {
                events.push(instant(
                    "PlaybackRejected",
                    "Playback",
                    ts,
                    slide_lane(e.index),
                    json!({ "error": e.error.to_string() }),
                ));
            }
            TraceEvent::PreloadStep(e) => {
                events.push(instant(
                    "PreloadStep",
                    "Preload",
                    ts,
                    e.target.map_or(ACTIVE_LANE, slide_lane),
                    json!({
                        "chain": e.chain.0,
                        "generation": e.generation.0,
                        "step": e.step,
                        "direction": format!("{:?}", e.direction),
                        "outcome": format!("{:?}", e.outcome),
                    }),
                ));
            }
            TraceEvent::AudioAttach(e) => {
                events.push(instant(
                    "AudioAttach",
                    "Audio",
                    ts,
                    AUDIO_LANE,
                    json!({
                        "slide": e.index,
                        "path": format!("{:?}", e.path),
                        "start": format!("{:?}", e.start),
                    }),
                ));
            }
            TraceEvent::AudioPreload(e) => {
                events.push(instant(
                    "AudioPreload",
                    "Audio",
                    ts,
                    AUDIO_LANE,
                    json!({
                        "slide": e.index,
                        "outcome": format!("{:?}", e.outcome),
                    }),
                ));
            }
            TraceEvent::Drift(e) => {
                events.push(json!({
                    "ph": "C",
                    "name": "drift",
                    "cat": "Audio",
                    "ts": ts,
                    "pid": 0,
                    "tid": AUDIO_LANE,
                    "args": { "seconds": e.drift }
                }));
            }
            TraceEvent::AudioFailure(e) => {
                events.push(instant(
                    "AudioFailure",
                    "Audio",
                    ts,
                    AUDIO_LANE,
                    json!({
                        "carrier": e.carrier.0,
                        "role": format!("{:?}", e.role),
                    }),
                ));
            }
            TraceEvent::SlowLoad(e) => {
                let waited_ms = u64::try_from(e.waited.as_millis()).unwrap_or(u64::MAX);
                events.push(instant(
                    "SlowLoad",
                    "Transfer",
                    ts,
                    slide_lane(e.index),
                    json!({ "waited_ms": waited_ms }),
                ));
            }
            TraceEvent::Generation(e) => {
                events.push(instant(
                    "Generation",
                    "Scroll",
                    ts,
                    ACTIVE_LANE,
                    json!({
                        "generation": e.generation.0,
                        "cause": format!("{:?}", e.cause),
                    }),
                ));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn instant(name: &str, cat: &str, ts: f64, tid: usize, args: Value) -> Value {
    json!({
        "ph": "i",
        "name": name,
        "cat": cat,
        "ts": ts,
        "pid": 0,
        "tid": tid,
        "s": "t",
        "args": args,
    })
}

fn micros(at: Duration) -> f64 {
    at.as_nanos() as f64 / 1000.0
}
